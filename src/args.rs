use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "divine-referrals")]
#[command(about = "Referral network integrity engine for the Divine mining mini-app")]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Print the referral code of a user id and exit
    #[arg(long, value_name = "USER_ID")]
    pub encode_code: Option<i64>,

    /// Print the user id a referral code decodes to and exit
    #[arg(long, value_name = "CODE")]
    pub decode_code: Option<String>,

    /// Run database migrations and exit
    #[arg(long)]
    pub migrate_only: bool,

    /// Print a session token for a user id and exit (development)
    #[arg(long, value_name = "USER_ID")]
    pub issue_token: Option<i64>,

    /// Print an operator token and exit
    #[arg(long, value_name = "NAME")]
    pub issue_operator_token: Option<String>,
}
