//! Mapping callbacks and their type-erased storage.
//!
//! A parser holds exactly one callback for its whole life. The heap flavor
//! boxes it as a trait object; the inline flavor copies it into a fixed,
//! aligned byte region and remembers two monomorphized function pointers to
//! call and drop it, so the parser type does not depend on the closure type
//! and nothing is allocated.

use core::{
    marker::PhantomData,
    mem::{self, MaybeUninit},
};

use crate::context::{Phase, ValueContext};

/// Receives every value boundary of a parse.
///
/// Closures are adapted with [`SinglePhase`] or [`TwoPhase`] by the parser
/// constructors; implement this trait directly for callback types with their
/// own state.
///
/// Returning `false` fails the parse with
/// [`ErrorKind::Rejected`](crate::ErrorKind::Rejected) on the current line.
pub trait Callback<'t> {
    /// Handles one phase of one value.
    fn invoke(&mut self, ctx: &mut ValueContext<'_, 't>, phase: Phase) -> bool;
}

impl<'t, C: Callback<'t> + ?Sized> Callback<'t> for &mut C {
    fn invoke(&mut self, ctx: &mut ValueContext<'_, 't>, phase: Phase) -> bool {
        (**self).invoke(ctx, phase)
    }
}

/// Adapts a closure that is only asked to claim values.
///
/// The parsed phase is accepted without calling the closure again.
#[derive(Debug, Clone, Copy)]
pub struct SinglePhase<F>(pub F);

impl<'t, F> Callback<'t> for SinglePhase<F>
where
    F: FnMut(&mut ValueContext<'_, 't>) -> bool,
{
    fn invoke(&mut self, ctx: &mut ValueContext<'_, 't>, phase: Phase) -> bool {
        match phase {
            Phase::Claim => (self.0)(ctx),
            Phase::Parsed => true,
        }
    }
}

/// Adapts a closure that claims values and then verifies them once parsed.
#[derive(Debug, Clone, Copy)]
pub struct TwoPhase<F>(pub F);

impl<'t, F> Callback<'t> for TwoPhase<F>
where
    F: FnMut(&mut ValueContext<'_, 't>, Phase) -> bool,
{
    fn invoke(&mut self, ctx: &mut ValueContext<'_, 't>, phase: Phase) -> bool {
        (self.0)(ctx, phase)
    }
}

/// Alignment of the inline region. Callbacks with a stricter alignment do not
/// fit.
pub const INLINE_ALIGN: usize = 16;

#[repr(C, align(16))]
struct Region<const N: usize>([MaybeUninit<u8>; N]);

type InvokeFn<'t> = for<'a, 'b> unsafe fn(*mut u8, &'a mut ValueContext<'b, 't>, Phase) -> bool;

/// A callback stored inline in `N` bytes.
///
/// Constructing one from a callback larger than `N` bytes, or aligned to more
/// than [`INLINE_ALIGN`], fails to compile.
pub struct InlineCallback<'t, const N: usize> {
    region: Region<N>,
    invoke: InvokeFn<'t>,
    destroy: unsafe fn(*mut u8),
    // The erased callback may be neither `Send` nor `Sync`, and may borrow
    // data for `'t`.
    _marker: PhantomData<(*mut (), &'t ())>,
}

impl<'t, const N: usize> InlineCallback<'t, N> {
    /// Moves `callback` into the inline region.
    pub fn new<C: Callback<'t> + 't>(callback: C) -> Self {
        const {
            assert!(
                mem::size_of::<C>() <= N,
                "mapping callback does not fit the inline capacity"
            );
            assert!(
                mem::align_of::<C>() <= INLINE_ALIGN,
                "mapping callback is over-aligned for inline storage"
            );
        }
        let mut region = Region([MaybeUninit::uninit(); N]);
        // SAFETY: the region is at least `size_of::<C>()` bytes and aligned to
        // at least `align_of::<C>()`, as checked above.
        unsafe { region.0.as_mut_ptr().cast::<C>().write(callback) };
        Self {
            region,
            invoke: invoke_raw::<C>,
            destroy: destroy_raw::<C>,
            _marker: PhantomData,
        }
    }

    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.region.0.as_mut_ptr().cast()
    }
}

impl<'t, const N: usize> Callback<'t> for InlineCallback<'t, N> {
    fn invoke(&mut self, ctx: &mut ValueContext<'_, 't>, phase: Phase) -> bool {
        let invoke = self.invoke;
        // SAFETY: `invoke` was instantiated for the type written into the
        // region by `new`, which stays initialized until `drop`.
        unsafe { invoke(self.as_mut_ptr(), ctx, phase) }
    }
}

impl<const N: usize> Drop for InlineCallback<'_, N> {
    fn drop(&mut self) {
        let destroy = self.destroy;
        // SAFETY: the region holds the callback written by `new`; it is
        // dropped exactly once, here.
        unsafe { destroy(self.as_mut_ptr()) }
    }
}

/// # Safety
///
/// `region` must point to an initialized, properly aligned `C`.
unsafe fn invoke_raw<'t, C: Callback<'t>>(
    region: *mut u8,
    ctx: &mut ValueContext<'_, 't>,
    phase: Phase,
) -> bool {
    // SAFETY: guaranteed by the caller.
    let callback = unsafe { &mut *region.cast::<C>() };
    callback.invoke(ctx, phase)
}

/// # Safety
///
/// `region` must point to an initialized, properly aligned `C` that is not
/// used afterwards.
unsafe fn destroy_raw<C>(region: *mut u8) {
    // SAFETY: guaranteed by the caller.
    unsafe { region.cast::<C>().drop_in_place() }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    struct DropCounter<'a>(&'a Cell<usize>);

    impl Drop for DropCounter<'_> {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn single_phase_accepts_parsed_phase() {
        let calls = Cell::new(0);
        let mut callback = SinglePhase(|_: &mut ValueContext<'_, '_>| {
            calls.set(calls.get() + 1);
            false
        });
        let mut slot = None;
        let mut ctx = ValueContext::new("", "key", &mut slot);
        assert!(!callback.invoke(&mut ctx, Phase::Claim));
        assert!(callback.invoke(&mut ctx, Phase::Parsed));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn two_phase_sees_both_phases() {
        let mut seen = [None; 2];
        let mut count = 0;
        let mut callback = TwoPhase(|_: &mut ValueContext<'_, '_>, phase: Phase| {
            seen[count] = Some(phase);
            count += 1;
            phase == Phase::Claim
        });
        let mut slot = None;
        let mut ctx = ValueContext::new("", "key", &mut slot);
        assert!(callback.invoke(&mut ctx, Phase::Claim));
        assert!(!callback.invoke(&mut ctx, Phase::Parsed));
        drop(callback);
        assert_eq!(seen, [Some(Phase::Claim), Some(Phase::Parsed)]);
    }

    #[test]
    fn inline_invokes_and_drops_once() {
        let drops = Cell::new(0);
        let calls = &Cell::new(0);
        {
            let guard = DropCounter(&drops);
            let mut inline = InlineCallback::<'_, 64>::new(SinglePhase(
                move |_: &mut ValueContext<'_, '_>| {
                    let _guard = &guard;
                    calls.set(calls.get() + 1);
                    true
                },
            ));
            let mut slot = None;
            let mut ctx = ValueContext::new("", "key", &mut slot);
            assert!(inline.invoke(&mut ctx, Phase::Claim));
            assert!(inline.invoke(&mut ctx, Phase::Claim));
            assert_eq!(drops.get(), 0);
        }
        assert_eq!(calls.get(), 2);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn inline_survives_moves() {
        let total = &Cell::new(0u32);
        let step = 3;
        let mut moved = InlineCallback::<'_, 32>::new(SinglePhase(
            move |_: &mut ValueContext<'_, '_>| {
                total.set(total.get() + step);
                true
            },
        ));
        let mut slot = None;
        let mut ctx = ValueContext::new("", "key", &mut slot);
        assert!(moved.invoke(&mut ctx, Phase::Claim));
        let mut boxed = std::boxed::Box::new(moved);
        assert!(boxed.invoke(&mut ctx, Phase::Claim));
        assert_eq!(total.get(), 6);
    }
}
