//! 服务任务监管
//!
//! 所有服务任务放进同一个 `JoinSet`，按完成顺序收取结果。任一任务出错
//! 立即广播关闭，其余任务退出后返回第一个错误。

use anyhow::anyhow;
use std::future::Future;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{error, info};

type TaskOutcome = (&'static str, anyhow::Result<()>);

pub struct ServiceSupervisor {
    tasks: JoinSet<TaskOutcome>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ServiceSupervisor {
    pub fn new(shutdown_tx: broadcast::Sender<()>) -> Self {
        Self {
            tasks: JoinSet::new(),
            shutdown_tx,
        }
    }

    /// 启动一个具名服务任务
    pub fn spawn<F>(&mut self, name: &'static str, service: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.tasks.spawn(async move { (name, service.await) });
    }

    /// 等待全部任务结束
    pub async fn wait(mut self) -> anyhow::Result<()> {
        let mut first_error = None;

        while let Some(joined) = self.tasks.join_next().await {
            let outcome = match joined {
                Ok((name, Ok(()))) => {
                    info!("{} service stopped", name);
                    continue;
                }
                Ok((name, Err(e))) => e.context(format!("{name} service failed")),
                Err(e) => anyhow!("Service task terminated unexpectedly: {e}"),
            };

            error!("{:#}", outcome);
            if first_error.is_none() {
                let _ = self.shutdown_tx.send(());
                first_error = Some(outcome);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
