//! Macros for building effects inside reducers.
//!
//! Reducers clone what they need out of the environment and hand an
//! `async move` block to [`async_effect!`]; the store spawns it and feeds the
//! resulting action back.

/// Create an `Effect::Future` from an async block body
///
/// The body must evaluate to `Option<Action>`.
///
/// # Example
///
/// ```rust,ignore
/// let api = Arc::clone(&env.api);
/// async_effect! {
///     match api.get_raffle(&id).await {
///         Ok(raffle) => Some(RaffleAction::DetailLoaded { token, raffle }),
///         Err(error) => Some(RaffleAction::DetailFailed { token, error }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling a future action
///
/// # Example
///
/// ```rust,ignore
/// delay! {
///     duration: env.poll_interval,
///     action: AdvertiserAction::Poll { tick }
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

/// Create a fire-and-forget effect that produces no action
///
/// Used for storage writes and signal publishing.
///
/// # Example
///
/// ```rust,ignore
/// fire_and_forget! {
///     storage.remove(keys::TOKEN);
/// }
/// ```
#[macro_export]
macro_rules! fire_and_forget {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move {
                $($body)*
                None
            })
        )
    };
}
