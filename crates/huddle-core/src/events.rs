/// Internal change notification fanned out by the stores.
///
/// The badge aggregator recomputes on any of these firing; it never
/// interprets the variant beyond "something relevant changed". That keeps
/// the recompute a pure function of current state rather than a state
/// machine over event sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataChange {
    Messages,
    Tasks,
    Activity,
    Watermarks,
    Focus,
}
