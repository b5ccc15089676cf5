/// An event carrying a result slot that subscribers fill in. Every write
/// replaces the previous one, so the last subscriber to set it wins.
pub trait ResultEvent {
    type Output;

    fn result(&self) -> Option<&Self::Output>;

    fn set_result(&mut self, result: Self::Output);

    fn take_result(&mut self) -> Option<Self::Output>;
}
