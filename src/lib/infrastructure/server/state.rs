use crate::application::Gateway;
use std::sync::Arc;

pub struct ServerState {
    gateway: Arc<Gateway>,
}

impl ServerState {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }
}
