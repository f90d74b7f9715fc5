use derive_more::Constructor;
use std::marker::PhantomData;

/// Minimal send-only capability, so callers can depend on "something I can notify" without
/// committing to `mpsc` vs `broadcast` vs a test double.
pub trait Tx
where
    Self: Clone + Send,
{
    type Item;
    type Error;

    fn send(&self, item: Self::Item) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Constructor)]
pub struct UnboundedTx<T, Error> {
    tx: tokio::sync::mpsc::UnboundedSender<T>,
    phantom: PhantomData<Error>,
}

impl<T, Error> Tx for UnboundedTx<T, Error>
where
    T: Clone + Send,
    Error: From<tokio::sync::mpsc::error::SendError<T>> + Send,
{
    type Item = T;
    type Error = Error;

    fn send(&self, item: Self::Item) -> Result<(), Self::Error> {
        self.tx.send(item).map_err(Error::from)
    }
}

#[derive(Debug, Constructor)]
pub struct UnboundedRx<T> {
    pub rx: tokio::sync::mpsc::UnboundedReceiver<T>,
}

impl<T> UnboundedRx<T> {
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

pub fn unbounded<T, Error>() -> (UnboundedTx<T, Error>, UnboundedRx<T>) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    (UnboundedTx::new(tx), UnboundedRx::new(rx))
}
