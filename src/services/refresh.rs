// src/services/refresh.rs
//
// Tarefa periódica que regenera o relatório público. O handle fica guardado
// em main e é parado no desligamento; depois do stop nada mais é gravado.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::{
    sync::{oneshot, RwLock},
    task::{JoinHandle, JoinSet},
    time::{self, MissedTickBehavior},
};

use crate::services::report_service::ReportService;

#[derive(Debug, Clone)]
pub struct PublicSnapshot {
    pub generated_at: DateTime<Utc>,
    pub revision: u64,
    pub body: Arc<Value>,
}

/// Último relatório público gerado. Só o refresher escreve aqui.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<RwLock<Option<PublicSnapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn replace(&self, body: Value) -> u64 {
        let mut slot = self.inner.write().await;
        let revision = slot.as_ref().map_or(1, |s| s.revision + 1);
        *slot = Some(PublicSnapshot {
            generated_at: Utc::now(),
            revision,
            body: Arc::new(body),
        });
        revision
    }

    pub async fn get(&self) -> Option<PublicSnapshot> {
        self.inner.read().await.clone()
    }
}

pub struct RefreshHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Sinaliza a parada e espera a tarefa terminar.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Tarefa de atualização terminou com erro: {}", e);
            }
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

pub fn spawn_refresher(service: ReportService, store: SnapshotStore, every: Duration) -> RefreshHandle {
    let every = every.max(Duration::from_secs(1));
    let (shutdown, mut stopped) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        tracing::info!("Relatório público será atualizado a cada {}s", every.as_secs());
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = &mut stopped => break,
                _ = interval.tick() => {}
            }

            // Cada geração roda em tarefa própria: um panic derruba só esta rodada.
            // O JoinSet aborta a geração se a tarefa principal for abortada.
            let mut generation = JoinSet::new();
            let job_service = service.clone();
            generation.spawn(async move { job_service.public_report().await });

            // Parada durante a geração descarta o resultado em andamento.
            tokio::select! {
                biased;
                _ = &mut stopped => {
                    generation.abort_all();
                    break;
                }
                Some(joined) = generation.join_next() => match joined {
                    Ok(Ok(body)) => {
                        let revision = store.replace(body).await;
                        tracing::debug!("Relatório público atualizado (revisão {})", revision);
                    }
                    Ok(Err(e)) => tracing::warn!("Falha ao gerar o relatório público: {}", e),
                    Err(e) => tracing::error!("Geração do relatório público abortada: {}", e),
                },
            }
        }

        tracing::info!("Atualização do relatório público encerrada");
    });

    RefreshHandle {
        shutdown: Some(shutdown),
        task: Some(task),
    }
}
