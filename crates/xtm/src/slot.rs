/// Function pointer type used by the function-dispatch usage pattern:
/// `push_fun`/`invoke_funs_all`.
pub type QueueFn = unsafe fn(*mut ());

/// The function-dispatch payload: a function pointer plus its opaque
/// argument, stored together so a single ring slot carries both.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct FunSlot {
    pub fun: QueueFn,
    pub fun_arg: *mut (),
}

/// A single ring slot, shared between the two mutually exclusive usage
/// patterns the queue supports (function-dispatch and pointer-transfer).
///
/// Rust has no direct equivalent of the original `union xtm_msg` on stable:
/// an untagged `union` can hold either variant but reading the "wrong" one
/// is undefined behavior, so `Slot` is read and written exclusively through
/// the typed `Queue` methods that established which pattern this queue uses
/// (enforced at runtime, debug builds only, via `debug_assert_single_pattern!`).
#[derive(Clone, Copy)]
#[repr(C)]
pub union Slot {
    pub fun_slot: FunSlot,
    pub ptr: *mut (),
}

impl Default for Slot {
    /// An all-zero slot. Never read through either variant until a push has
    /// written one of them; `Ring` only ever exposes slots within `[read,
    /// write)`, which always holds a value a push wrote.
    fn default() -> Self {
        Self { ptr: std::ptr::null_mut() }
    }
}

// Safety: a `Slot` only ever carries a `FunSlot` or a raw pointer handed to
// us by the caller; it never owns `T`-typed data with drop glue, so moving
// it across threads (the whole point of the queue) is sound as long as the
// caller upholds the same contract they would for a raw pointer.
unsafe impl Send for Slot {}

impl Slot {
    #[inline]
    #[must_use]
    pub const fn from_fun(fun: QueueFn, fun_arg: *mut ()) -> Self {
        Self {
            fun_slot: FunSlot { fun, fun_arg },
        }
    }

    #[inline]
    #[must_use]
    pub const fn from_ptr(ptr: *mut ()) -> Self {
        Self { ptr }
    }

    /// # Safety
    ///
    /// The caller must guarantee this slot was written via [`Slot::from_fun`].
    #[inline]
    pub unsafe fn as_fun_slot(&self) -> FunSlot {
        unsafe { self.fun_slot }
    }

    /// # Safety
    ///
    /// The caller must guarantee this slot was written via [`Slot::from_ptr`].
    #[inline]
    pub unsafe fn as_ptr(&self) -> *mut () {
        unsafe { self.ptr }
    }
}

/// Which of the two mutually exclusive usage patterns a queue has committed
/// to. Tracked only in debug builds, set by whichever of `push_fun`/
/// `push_ptr` is called first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum UsagePattern {
    Unset = 0,
    FunctionDispatch = 1,
    PointerTransfer = 2,
}

impl From<u8> for UsagePattern {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::FunctionDispatch,
            2 => Self::PointerTransfer,
            _ => Self::Unset,
        }
    }
}
