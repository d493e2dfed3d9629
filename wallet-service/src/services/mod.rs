pub mod wallet_session;
