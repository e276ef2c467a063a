use secrecy::SecretString;

#[derive(Debug)]
pub struct GlobalArgs {
    pub api_server_url: String,
    pub api_code: String,
    pub api_secret: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api_server_url: String, api_code: String, api_secret: SecretString) -> Self {
        Self {
            api_server_url,
            api_code,
            api_secret,
        }
    }
}
