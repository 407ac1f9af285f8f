//! Macros for ergonomic table construction.

/// Build a [`TransitionTable`](crate::core::TransitionTable) from a compact
/// state/event listing. Identifiers become state and event names verbatim.
///
/// Evaluates to `Result<TransitionTable, BuildError>`.
///
/// # Example
///
/// ```
/// use statewire::transition_table;
///
/// let table = transition_table! {
///     initial: Idle,
///     Idle => { up => MovingUp, emergency_trigger => Emergency },
///     MovingUp => { stop => Idle, emergency_trigger => Emergency },
///     Emergency => { reset => Idle },
/// }
/// .unwrap();
///
/// assert_eq!(table.initial_state().as_str(), "Idle");
/// assert_eq!(table.rule("MovingUp", "stop").unwrap().target.as_str(), "Idle");
/// ```
#[macro_export]
macro_rules! transition_table {
    (
        initial: $initial:ident,
        $(
            $state:ident => { $( $event:ident => $target:ident ),* $(,)? }
        ),* $(,)?
    ) => {{
        let builder = $crate::builder::TableBuilder::new().initial(stringify!($initial));
        $(
            let builder = builder.state(stringify!($state));
            $(
                let builder = builder.transition(
                    stringify!($state),
                    stringify!($event),
                    stringify!($target),
                );
            )*
        )*
        builder.build()
    }};
}
