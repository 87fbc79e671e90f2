//! Authentication state traits and macro.

/// Trait for state types used with the auth extractors.
pub trait HasAuthSettings {
    fn secure_cookies(&self) -> bool;
}

/// Macro to implement `HasAuthSettings` for state structs with the standard field.
///
/// The struct must have a `secure_cookies: bool` field.
///
/// # Example
/// ```ignore
/// #[derive(Clone)]
/// pub struct MyState {
///     pub secure_cookies: bool,
///     // ... other fields
/// }
///
/// tollgate::impl_has_auth_settings!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_settings {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthSettings for $state_type {
            fn secure_cookies(&self) -> bool {
                self.secure_cookies
            }
        }
    };
}
