#[cold]
fn cold() {}

/// Hints to the compiler that the branch condition is almost always true.
#[inline(always)]
pub fn likely(b: bool) -> bool {
    if !b {
        cold()
    }
    b
}

/// Hints to the compiler that the branch condition is almost always false.
#[inline(always)]
pub fn unlikely(b: bool) -> bool {
    if b {
        cold()
    }
    b
}
