pub mod jwt;
pub mod referral_code;

#[cfg(test)]
pub mod test_app_state;
#[cfg(test)]
pub mod test_db;
#[cfg(test)]
pub mod test_store;
