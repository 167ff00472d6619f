//! Property-based invariant tests for render gating and subject delivery.
//!
//! 1. A forced gate check always renders.
//! 2. An unforced check renders iff the update carries an observed property.
//! 3. Dependency marking is monotonic: the observed set is the union of marks.
//! 4. Proxy getters mark exactly the properties that were read.
//! 5. A subject delivers every value to live observers in subscription order.
//! 6. An unsubscribed observer never sees a later value.
//! 7. Name filtering: no filter, or an update without a name, always matches.

use std::cell::RefCell;
use std::rc::Rc;

use hookform_runtime::{
    DependencySet, FormState, FormStateFlags, FormStateUpdate, ProxyFormState, Subject,
    should_render_form_state, should_subscribe_by_name,
};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn flags_strategy() -> impl Strategy<Value = FormStateFlags> {
    any::<u16>().prop_map(FormStateFlags::from_bits_truncate)
}

/// An update carrying exactly the properties in `keys`.
fn update_with(keys: FormStateFlags) -> FormStateUpdate {
    let mut update = FormStateUpdate::from(&FormState::default());
    if !keys.contains(FormStateFlags::IS_DIRTY) {
        update.is_dirty = None;
    }
    if !keys.contains(FormStateFlags::IS_VALIDATING) {
        update.is_validating = None;
    }
    if !keys.contains(FormStateFlags::DIRTY_FIELDS) {
        update.dirty_fields = None;
    }
    if !keys.contains(FormStateFlags::IS_SUBMITTED) {
        update.is_submitted = None;
    }
    if !keys.contains(FormStateFlags::SUBMIT_COUNT) {
        update.submit_count = None;
    }
    if !keys.contains(FormStateFlags::TOUCHED_FIELDS) {
        update.touched_fields = None;
    }
    if !keys.contains(FormStateFlags::IS_SUBMITTING) {
        update.is_submitting = None;
    }
    if !keys.contains(FormStateFlags::IS_SUBMIT_SUCCESSFUL) {
        update.is_submit_successful = None;
    }
    if !keys.contains(FormStateFlags::IS_VALID) {
        update.is_valid = None;
    }
    if !keys.contains(FormStateFlags::ERRORS) {
        update.errors = None;
    }
    update
}

/// Call getter `index` and return the flag it should mark.
fn read(proxy: &ProxyFormState, index: usize) -> FormStateFlags {
    match index % 10 {
        0 => {
            let _ = proxy.is_dirty();
            FormStateFlags::IS_DIRTY
        }
        1 => {
            let _ = proxy.is_validating();
            FormStateFlags::IS_VALIDATING
        }
        2 => {
            let _ = proxy.dirty_fields();
            FormStateFlags::DIRTY_FIELDS
        }
        3 => {
            let _ = proxy.is_submitted();
            FormStateFlags::IS_SUBMITTED
        }
        4 => {
            let _ = proxy.submit_count();
            FormStateFlags::SUBMIT_COUNT
        }
        5 => {
            let _ = proxy.touched_fields();
            FormStateFlags::TOUCHED_FIELDS
        }
        6 => {
            let _ = proxy.is_submitting();
            FormStateFlags::IS_SUBMITTING
        }
        7 => {
            let _ = proxy.is_submit_successful();
            FormStateFlags::IS_SUBMIT_SUCCESSFUL
        }
        8 => {
            let _ = proxy.is_valid();
            FormStateFlags::IS_VALID
        }
        _ => {
            let _ = proxy.errors();
            FormStateFlags::ERRORS
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Forced gate always renders
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn forced_gate_always_renders(keys in flags_strategy(), observed in flags_strategy()) {
        let deps = DependencySet::new();
        deps.mark(observed);
        prop_assert!(should_render_form_state(&update_with(keys), &deps, true));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Unforced gate is the key intersection
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn unforced_gate_is_intersection(keys in flags_strategy(), observed in flags_strategy()) {
        let deps = DependencySet::new();
        deps.mark(observed);
        let update = update_with(keys);

        prop_assert_eq!(update.keys(), keys);
        prop_assert_eq!(
            should_render_form_state(&update, &deps, false),
            keys.intersects(observed)
        );
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Marking is monotonic
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn marking_is_monotonic(marks in proptest::collection::vec(flags_strategy(), 0..16)) {
        let deps = DependencySet::new();
        let mut union = FormStateFlags::empty();
        for mark in marks {
            let before = deps.observed();
            deps.mark(mark);
            union |= mark;
            prop_assert!(deps.observed().contains(before));
            prop_assert_eq!(deps.observed(), union);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Getters mark what was read
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn getters_mark_exactly_reads(
        reads in proptest::collection::vec(0usize..10, 0..24),
        submit_count in 0u32..100,
        is_dirty in any::<bool>(),
    ) {
        let state = Rc::new(FormState { submit_count, is_dirty, ..FormState::default() });
        let root = DependencySet::new();
        let local = DependencySet::new();
        let proxy = ProxyFormState::new(Rc::clone(&state), root.clone()).with_local(local.clone());

        let mut expected = FormStateFlags::empty();
        for index in reads {
            expected |= read(&proxy, index);
        }

        prop_assert_eq!(root.observed(), expected);
        prop_assert_eq!(local.observed(), expected);
        prop_assert_eq!(proxy.submit_count(), submit_count);
        prop_assert_eq!(proxy.is_dirty(), is_dirty);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Ordered delivery to every live observer
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn delivery_in_subscription_order(
        observers in 1usize..8,
        values in proptest::collection::vec(any::<i32>(), 0..8),
    ) {
        let subject: Subject<i32> = Subject::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let _subscriptions: Vec<_> = (0..observers)
            .map(|id| {
                let log = Rc::clone(&log);
                subject.subscribe(move |value| log.borrow_mut().push((id, *value)))
            })
            .collect();

        for value in &values {
            subject.next(value);
        }

        let expected: Vec<_> = values
            .iter()
            .flat_map(|value| (0..observers).map(move |id| (id, *value)))
            .collect();
        prop_assert_eq!(&*log.borrow(), &expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Unsubscribed observers stay silent
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn unsubscribed_observer_stays_silent(
        before in proptest::collection::vec(any::<i32>(), 0..6),
        after in proptest::collection::vec(any::<i32>(), 0..6),
        extra_unsubscribes in 0usize..3,
    ) {
        let subject: Subject<i32> = Subject::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut subscription = subject.subscribe(move |value| sink.borrow_mut().push(*value));

        for value in &before {
            subject.next(value);
        }
        for _ in 0..=extra_unsubscribes {
            subscription.unsubscribe();
        }
        for value in &after {
            subject.next(value);
        }

        prop_assert_eq!(&*seen.borrow(), &before);
        prop_assert_eq!(subject.observer_count(), 0);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Name filtering
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn unfiltered_or_unnamed_always_matches(
        names in proptest::collection::vec("[a-z]{1,6}", 0..4),
        signal in "[a-z.]{0,10}",
        exact in any::<bool>(),
    ) {
        prop_assert!(should_subscribe_by_name(None, Some(signal.as_str()), exact));
        prop_assert!(should_subscribe_by_name(Some(names.as_slice()), None, exact));
    }

    #[test]
    fn exact_filter_requires_equal_name(
        names in proptest::collection::vec("[a-z]{1,6}", 1..4),
        signal in "[a-z]{1,6}",
    ) {
        prop_assert_eq!(
            should_subscribe_by_name(Some(names.as_slice()), Some(signal.as_str()), true),
            names.contains(&signal)
        );
    }
}
