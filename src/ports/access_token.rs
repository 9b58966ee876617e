use color_eyre::eyre::Result;

/// Supplies a valid bearer token for each remote call. Token refresh is the
/// implementor's business.
#[async_trait::async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A token handed in from the command line or environment.
pub struct StaticAccessToken(String);

impl StaticAccessToken {
    pub fn new(token: String) -> Self {
        Self(token)
    }
}

#[async_trait::async_trait]
impl AccessTokenSource for StaticAccessToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
