use crate::domain::model::Snapshot;
use crate::utils::error::ClinicError;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;

/// 一次刷新的結果；錯誤以 `Arc` 包裝，讓合併的呼叫者共享同一個值
pub type RefreshOutcome = std::result::Result<Arc<Snapshot>, Arc<ClinicError>>;

#[derive(Debug, Clone, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Ready(Arc<Snapshot>),
    Failed(Arc<ClinicError>),
}

impl FetchState {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        match self {
            FetchState::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Arc<ClinicError>> {
        match self {
            FetchState::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// 同一個 `Arc` 才算相等
impl PartialEq for FetchState {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FetchState::Idle, FetchState::Idle) => true,
            (FetchState::Loading, FetchState::Loading) => true,
            (FetchState::Ready(a), FetchState::Ready(b)) => Arc::ptr_eq(a, b),
            (FetchState::Failed(a), FetchState::Failed(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// 保存目前的 `FetchState` 與最後一份成功的快照。
/// 狀態只會整個替換，觀察者不會看到半成品。
#[derive(Debug)]
pub struct SnapshotStore {
    state: watch::Sender<FetchState>,
    latest: RwLock<Option<Arc<Snapshot>>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(FetchState::Idle);
        Self {
            state,
            latest: RwLock::new(None),
        }
    }

    pub fn current_state(&self) -> FetchState {
        self.state.borrow().clone()
    }

    /// 狀態變化的串流
    pub fn observe(&self) -> watch::Receiver<FetchState> {
        self.state.subscribe()
    }

    /// 最後一份成功的快照；刷新中或失敗後仍保留
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 進入 Loading，回傳先前的狀態供取消時還原
    pub fn begin_refresh(&self) -> FetchState {
        let previous = self.state.send_replace(FetchState::Loading);
        tracing::debug!("Store: {} -> Loading", state_name(&previous));
        previous
    }

    pub fn complete_refresh(&self, outcome: &RefreshOutcome) {
        let next = match outcome {
            Ok(snapshot) => {
                *self.latest.write().unwrap_or_else(PoisonError::into_inner) =
                    Some(snapshot.clone());
                FetchState::Ready(snapshot.clone())
            }
            Err(error) => FetchState::Failed(error.clone()),
        };
        tracing::debug!("Store: Loading -> {}", state_name(&next));
        self.state.send_replace(next);
    }

    /// 取消刷新時回到開始前的狀態
    pub fn restore(&self, previous: FetchState) {
        tracing::debug!("Store: Loading -> {} (restored)", state_name(&previous));
        self.state.send_replace(previous);
    }
}

fn state_name(state: &FetchState) -> &'static str {
    match state {
        FetchState::Idle => "Idle",
        FetchState::Loading => "Loading",
        FetchState::Ready(_) => "Ready",
        FetchState::Failed(_) => "Failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Arc<Snapshot> {
        Arc::new(Snapshot::new(vec![], vec![], vec![]))
    }

    #[test]
    fn test_transitions() {
        let store = SnapshotStore::new();
        assert_eq!(store.current_state(), FetchState::Idle);

        let previous = store.begin_refresh();
        assert_eq!(previous, FetchState::Idle);
        assert!(store.current_state().is_loading());

        let first = snapshot();
        store.complete_refresh(&Ok(first.clone()));
        assert_eq!(store.current_state(), FetchState::Ready(first.clone()));

        store.begin_refresh();
        store.complete_refresh(&Err(Arc::new(ClinicError::Refresh { failures: vec![] })));
        assert!(store.current_state().error().is_some());
        // the last good snapshot survives a failed refresh
        assert!(Arc::ptr_eq(&store.snapshot().unwrap(), &first));
    }

    #[test]
    fn test_restore_after_cancel() {
        let store = SnapshotStore::new();
        let ready = snapshot();
        store.begin_refresh();
        store.complete_refresh(&Ok(ready.clone()));

        let previous = store.begin_refresh();
        store.restore(previous);

        assert_eq!(store.current_state(), FetchState::Ready(ready));
    }

    #[tokio::test]
    async fn test_observers_see_loading_before_ready() {
        let store = SnapshotStore::new();
        let mut rx = store.observe();

        store.begin_refresh();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_loading());

        store.complete_refresh(&Ok(snapshot()));
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().snapshot().is_some());
    }
}
