use crate::types::{TypeArg, TypeToken};

/// Whether a subscriber declared for `interest` should see a value whose
/// runtime type is `runtime`. Invariant in every argument; an interest
/// without arguments accepts every parameterization of its base.
pub fn matches(interest: &TypeToken, runtime: &TypeToken) -> bool {
    if interest.erased() != runtime.erased() {
        return false;
    }
    if interest.is_raw() {
        return true;
    }
    interest.args().len() == runtime.args().len()
        && interest.args().iter().zip(runtime.args()).all(|(interest, runtime)| argument_matches(interest, runtime))
}

fn argument_matches(interest: &TypeArg, runtime: &TypeArg) -> bool {
    match (interest, runtime) {
        (TypeArg::Wildcard, _) => true,
        (TypeArg::Type(_), TypeArg::Wildcard) => false,
        (TypeArg::Type(interest), TypeArg::Type(runtime)) => matches(interest, runtime),
    }
}
