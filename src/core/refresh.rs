use crate::core::pipeline::AggregationPipeline;
use crate::core::store::{FetchState, RefreshOutcome, SnapshotStore};
use crate::domain::model::Snapshot;
use crate::utils::error::ClinicError;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// 進行中的刷新；可被多個呼叫者同時 await
pub type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

struct InFlight {
    pending: PendingRefresh,
    cancel: CancellationToken,
}

struct Inner {
    pipeline: AggregationPipeline,
    store: SnapshotStore,
    in_flight: Mutex<Option<InFlight>>,
    started: AtomicU64,
}

impl Inner {
    fn in_flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 唯一寫入 store 的地方；與清除 in-flight 在同一把鎖內完成
    fn finish(&self, outcome: &RefreshOutcome, previous: FetchState) {
        let mut in_flight = self.in_flight();
        match outcome {
            Err(error) if matches!(error.as_ref(), ClinicError::Cancelled) => {
                tracing::info!("🛑 Refresh cancelled, state restored");
                self.store.restore(previous);
            }
            _ => self.store.complete_refresh(outcome),
        }
        *in_flight = None;
    }
}

/// 給使用端的入口：刷新、觀察狀態、取消。
/// 刷新進行中再次要求刷新時，會合併到同一個進行中的結果。
#[derive(Clone)]
pub struct RefreshController {
    inner: Arc<Inner>,
}

impl RefreshController {
    pub fn new(pipeline: AggregationPipeline) -> Self {
        Self {
            inner: Arc::new(Inner {
                pipeline,
                store: SnapshotStore::new(),
                in_flight: Mutex::new(None),
                started: AtomicU64::new(0),
            }),
        }
    }

    pub fn current_state(&self) -> FetchState {
        self.inner.store.current_state()
    }

    pub fn observe(&self) -> watch::Receiver<FetchState> {
        self.inner.store.observe()
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.store.snapshot()
    }

    /// 實際啟動過幾次管線（合併的請求不計）
    pub fn refreshes_started(&self) -> u64 {
        self.inner.started.load(Ordering::SeqCst)
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.in_flight().is_some()
    }

    /// 啟動刷新（或加入進行中的刷新）。回傳前狀態已是 Loading。
    /// 必須在 tokio runtime 內呼叫。
    pub fn start_refresh(&self) -> PendingRefresh {
        let mut in_flight = self.inner.in_flight();
        if let Some(current) = in_flight.as_ref() {
            tracing::debug!("Refresh already in flight, coalescing");
            return current.pending.clone();
        }

        let previous = self.inner.store.begin_refresh();
        let run = self.inner.started.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();

        let task_inner = self.inner.clone();
        let task_cancel = cancel.clone();
        let task_previous = previous.clone();
        let handle = tokio::spawn(async move {
            tracing::debug!("Refresh #{} started", run);
            let outcome: RefreshOutcome = tokio::select! {
                _ = task_cancel.cancelled() => Err(Arc::new(ClinicError::Cancelled)),
                result = task_inner.pipeline.refresh() => {
                    result.map(Arc::new).map_err(Arc::new)
                }
            };
            task_inner.finish(&outcome, task_previous);
            outcome
        });

        let join_inner = self.inner.clone();
        let pending = async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let outcome: RefreshOutcome = Err(Arc::new(ClinicError::TaskError {
                        message: e.to_string(),
                    }));
                    join_inner.finish(&outcome, previous);
                    outcome
                }
            }
        }
        .boxed()
        .shared();

        *in_flight = Some(InFlight {
            pending: pending.clone(),
            cancel,
        });
        pending
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        self.start_refresh().await
    }

    /// 取消進行中的刷新；沒有刷新時回傳 false
    pub fn cancel(&self) -> bool {
        match self.inner.in_flight().as_ref() {
            Some(current) => {
                current.cancel.cancel();
                true
            }
            None => false,
        }
    }
}
