use crate::core::config::data::{path_display, Config};
use crate::core::config::defaults::DEFAULT_MODEL;

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        match &self.model {
            Some(model) => println!("  model: {model}"),
            None => println!("  model: (unset, using {DEFAULT_MODEL})"),
        }
        println!("  base-url: {}", self.base_url());
        println!("  relay-url: {}", self.relay_url());
        println!("  relay-param: {}", self.relay_param());
        match self.stream_enabled() {
            true => println!("  stream: on"),
            false => println!("  stream: off"),
        }
        println!("  data-dir: {}", path_display(self.data_dir()));
        println!("  request-timeout: {}s", self.request_timeout().as_secs());
    }
}
