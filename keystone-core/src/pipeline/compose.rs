//! Right-to-left function composition.

/// A single composable stage.
pub type Stage<T> = Box<dyn FnOnce(T) -> T>;

/// Compose stages so that `compose(vec![f, g, h])(x) == f(g(h(x)))`.
///
/// The last stage is applied first; with no stages the result is the
/// identity function.
pub fn compose<T: 'static>(stages: Vec<Stage<T>>) -> Stage<T> {
    Box::new(move |input: T| {
        stages
            .into_iter()
            .rev()
            .fold(input, |acc, stage| stage(acc))
    })
}
