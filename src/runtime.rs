use tokio::task::{self, JoinError};



/// Runs blocking work on the runtime's blocking thread pool, so that it doesn't stall the other
/// tasks of the worker it was called from.
///
/// Returns an error only if `func` panicked.
pub async fn block_on<F, R>( func: F ) -> Result<R, JoinError> where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static
{
	task::spawn_blocking( func ).await
}
