pub mod config;
pub mod keeper;
pub mod rest;
pub mod storage;

use common::TokenIssuer;
use keeper::Keeper;

#[derive(Clone)]
pub struct AppState {
    pub keeper: Keeper,
    pub token_issuer: TokenIssuer,
}

impl AppState {
    pub fn new(keeper: Keeper, token_issuer: TokenIssuer) -> Self {
        Self {
            keeper,
            token_issuer,
        }
    }
}

pub use storage::Storage;
