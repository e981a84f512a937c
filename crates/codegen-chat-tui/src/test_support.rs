use std::sync::Arc;

use async_trait::async_trait;
use codegen_chat_core::{CodeGenerator, Controller, GenerateError};
use tokio::sync::Semaphore;

use crate::app::App;

/// Generator that answers with a fixed reply, one request per `release`
pub struct Gate {
    reply: Result<&'static str, &'static str>,
    permits: Semaphore,
}

impl Gate {
    pub fn new(code: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(code),
            permits: Semaphore::new(0),
        })
    }

    pub fn failing(error: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            permits: Semaphore::new(0),
        })
    }

    pub fn release(&self) {
        self.permits.add_permits(1);
    }
}

#[async_trait]
impl CodeGenerator for Gate {
    fn name(&self) -> &str {
        "gate"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
        self.permits
            .acquire()
            .await
            .map_err(|e| GenerateError::Aborted(e.to_string()))?
            .forget();
        self.reply
            .map(str::to_string)
            .map_err(|e| GenerateError::Service(e.to_string()))
    }
}

pub fn app_with(gate: Arc<Gate>) -> (App, Arc<Gate>) {
    let controller = Controller::new(gate.clone());
    (App::new(controller, None), gate)
}
