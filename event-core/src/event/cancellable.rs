/// An event whose delivery can be stopped for subscribers that do not accept
/// cancelled events. The flag is only read between two subscribers, and a
/// later subscriber may clear it again.
pub trait Cancellable {
    fn cancelled(&self) -> bool;

    fn set_cancelled(&mut self, cancelled: bool);

    fn cancel(&mut self) {
        self.set_cancelled(true);
    }
}
