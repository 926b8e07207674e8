use std::collections::HashMap;
use std::sync::Arc;

use registry_uplink::{AgentOptions, HyperUplinkClient, MainConfig, UplinkConfig};

pub fn uplink_config(url: &str) -> UplinkConfig {
    UplinkConfig {
        url: url.to_string(),
        ca: None,
        timeout: "2s".to_string(),
        maxage: "2m".to_string(),
        max_fails: 2,
        fail_timeout: "60s".to_string(),
        strict_ssl: true,
        auth: None,
        headers: HashMap::new(),
        http_proxy: None,
        https_proxy: None,
        no_proxy: None,
        agent_options: AgentOptions::default(),
    }
}

pub fn main_config() -> MainConfig {
    MainConfig {
        user_agent: "verdaccio/6.0.0".to_string(),
        server_id: "test-server".to_string(),
        http_proxy: None,
        https_proxy: None,
        no_proxy: None,
    }
}

pub fn client_for(base_url: &str) -> Arc<HyperUplinkClient> {
    HyperUplinkClient::new("test-uplink", &uplink_config(base_url), &main_config()).unwrap()
}
