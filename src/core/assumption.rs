use std::sync::atomic::{AtomicBool, Ordering};

/// A process-wide guarantee that starts out valid and can only be
/// invalidated. Fast paths read it with a single relaxed load; whoever breaks
/// the guarantee flips it once and it stays off for the life of the process.
#[derive(Debug)]
pub struct Assumption {
    name: &'static str,
    valid: AtomicBool,
}

impl Assumption {
    pub const fn new(name: &'static str) -> Self {
        Assumption {
            name,
            valid: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    pub fn invalidate(&self, reason: &str) {
        if self.valid.swap(false, Ordering::AcqRel) {
            log::debug!("assumption '{}' invalidated: {}", self.name, reason);
        }
    }
}

static ARRAY_PROTOTYPE_NO_ELEMENTS: Assumption = Assumption::new("array prototype has no elements");
static TYPED_ARRAY_NOT_DETACHED: Assumption = Assumption::new("typed array buffer not detached");

/// Valid while no object sitting on the prototype chain of an array-shaped
/// object carries indexed elements, i.e. a hole can never be filled by an
/// inherited value.
pub fn array_prototype_no_elements() -> &'static Assumption {
    &ARRAY_PROTOTYPE_NO_ELEMENTS
}

/// Valid while no array buffer backing a typed array has ever been detached.
pub fn typed_array_not_detached() -> &'static Assumption {
    &TYPED_ARRAY_NOT_DETACHED
}
