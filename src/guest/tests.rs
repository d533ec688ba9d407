//! Comprehensive tests for the guest runtime

use super::*;
use crate::host::HostRef;

/// Test helper: runtime with a small collection threshold.
fn small_heap() -> GuestRuntime {
    GuestRuntime::with_config(GuestConfig {
        gc_threshold: 4,
        initial_capacity: 8,
    })
}

#[cfg(test)]
mod alloc_tests {
    use super::*;

    #[test]
    fn test_alloc_int_roundtrip() {
        let mut guest = GuestRuntime::new();
        let v = guest.alloc(GuestValue::Int(7));

        assert!(guest.is_pinned(v.get()));
        match guest.get(v.get()) {
            GuestValue::Int(7) => {}
            other => panic!("expected Int(7), got {other:?}"),
        }
    }

    #[test]
    fn test_nothing_is_slot_zero() {
        let guest = GuestRuntime::new();
        let n = guest.nothing();

        assert!(matches!(guest.get(n), GuestValue::Nothing));
        // The sentinel stays pinned for the whole runtime lifetime.
        assert!(guest.is_pinned(n));
    }

    #[test]
    fn test_alloc_reuses_swept_slots() {
        let mut guest = GuestRuntime::new();
        let first = guest.alloc(GuestValue::Int(1));
        let slot = first.get();
        drop(first);

        assert_eq!(guest.force_collect(), 1);

        let second = guest.alloc(GuestValue::Int(2));
        assert_eq!(second.get(), slot);
    }

    #[test]
    fn test_kind_names() {
        let mut guest = GuestRuntime::new();

        let b = guest.alloc(GuestValue::Bool(true));
        let s = guest.alloc(GuestValue::Str("hi".to_string()));
        let t = guest.alloc(GuestValue::Tuple(vec![]));

        assert_eq!(guest.kind_name(guest.nothing()), "nothing");
        assert_eq!(guest.kind_name(b.get()), "boolean");
        assert_eq!(guest.kind_name(s.get()), "string");
        assert_eq!(guest.kind_name(t.get()), "tuple");
    }

    #[test]
    fn test_stats_track_live() {
        let mut guest = GuestRuntime::new();
        assert_eq!(guest.stats().live, 1); // the sentinel

        let _a = guest.alloc(GuestValue::Int(1));
        let _b = guest.alloc(GuestValue::Int(2));
        let _c = guest.alloc(GuestValue::Float(3.0));

        let stats = guest.stats();
        assert_eq!(stats.live, 4);
        assert_eq!(stats.pinned, 4);
    }
}

#[cfg(test)]
mod roots_tests {
    use super::*;

    #[test]
    fn test_pin_released_on_drop() {
        let mut guest = GuestRuntime::new();
        let v = guest.alloc(GuestValue::Int(5));
        let r = v.get();

        assert!(guest.is_pinned(r));
        drop(v);
        assert!(!guest.is_pinned(r));
    }

    #[test]
    fn test_clone_repins() {
        let mut guest = GuestRuntime::new();
        let v1 = guest.alloc(GuestValue::Int(5));
        let r = v1.get();
        let v2 = v1.clone();

        drop(v1);
        // Second pin still in place
        assert!(guest.is_pinned(r));

        drop(v2);
        assert!(!guest.is_pinned(r));
    }

    #[test]
    fn test_root_takes_extra_pin() {
        let mut guest = GuestRuntime::new();
        let v = guest.alloc(GuestValue::Str("keep".to_string()));
        let r = v.get();
        let extra = guest.root(r);
        drop(v);

        assert!(guest.is_pinned(r));
        assert_eq!(guest.force_collect(), 0);
        assert!(matches!(guest.get(r), GuestValue::Str(s) if s == "keep"));

        drop(extra);
        assert!(!guest.is_pinned(r));
    }
}

#[cfg(test)]
mod gc_tests {
    use super::*;

    #[test]
    fn test_unpinned_slots_are_swept() {
        let mut guest = GuestRuntime::new();
        let a = guest.alloc(GuestValue::Int(1));
        let b = guest.alloc(GuestValue::Int(2));
        drop(a);
        drop(b);

        assert_eq!(guest.force_collect(), 2);
        assert_eq!(guest.stats().live, 1);
    }

    #[test]
    fn test_pinned_slots_survive() {
        let mut guest = GuestRuntime::new();
        let v = guest.alloc(GuestValue::Int(42));

        assert_eq!(guest.force_collect(), 0);
        assert!(matches!(guest.get(v.get()), GuestValue::Int(42)));
    }

    #[test]
    fn test_list_children_traced() {
        let mut guest = GuestRuntime::new();
        let child = guest.alloc(GuestValue::Int(3));
        let child_ref = child.get();
        let list = guest.alloc(GuestValue::List(vec![child_ref]));
        drop(child);

        // Unpinned but reachable from the pinned list
        assert_eq!(guest.force_collect(), 0);
        assert!(matches!(guest.get(child_ref), GuestValue::Int(3)));

        drop(list);
        assert_eq!(guest.force_collect(), 2);
    }

    #[test]
    fn test_nested_aggregates_traced() {
        let mut guest = GuestRuntime::new();
        let leaf = guest.alloc(GuestValue::Int(9));
        let leaf_ref = leaf.get();
        let inner = guest.alloc(GuestValue::List(vec![leaf_ref]));
        let inner_ref = inner.get();
        let outer = guest.alloc(GuestValue::Tuple(vec![inner_ref]));
        drop(leaf);
        drop(inner);

        assert_eq!(guest.force_collect(), 0);
        assert!(matches!(guest.get(leaf_ref), GuestValue::Int(9)));

        drop(outer);
        assert_eq!(guest.force_collect(), 3);
    }

    #[test]
    fn test_function_capture_keeps_value_alive() {
        let mut guest = GuestRuntime::new();
        let child = guest.alloc(GuestValue::Int(3));
        let child_ref = child.get();

        // The closure owns the handle, so the pin outlives this scope.
        let keeper = guest.register_fn("keeper", move |_b, _args| Ok(child.clone()));

        assert!(guest.is_pinned(child_ref));
        assert_eq!(guest.force_collect(), 0);
        assert!(matches!(guest.get(child_ref), GuestValue::Int(3)));

        drop(keeper);
    }

    #[test]
    fn test_threshold_triggers_collection() {
        let mut guest = small_heap();
        for n in 0..5 {
            let _v = guest.alloc(GuestValue::Int(n));
        }

        let stats = guest.stats();
        assert_eq!(stats.collections_run, 1);
        assert_eq!(stats.collected_total, 4);
    }

    #[test]
    fn test_force_collect_returns_swept_count() {
        let mut guest = GuestRuntime::new();
        let handles: Vec<_> = (0..3).map(|n| guest.alloc(GuestValue::Int(n))).collect();
        drop(handles);

        assert_eq!(guest.force_collect(), 3);
        assert_eq!(guest.force_collect(), 0);
    }

    #[test]
    fn test_swept_host_box_releases_host_value() {
        let mut guest = GuestRuntime::new();
        let host = HostRef::from_int(9);
        assert_eq!(host.ref_count(), 1);

        let boxed = guest.alloc(GuestValue::HostObj(host.clone()));
        assert_eq!(host.ref_count(), 2);

        drop(boxed);
        guest.force_collect();
        assert_eq!(host.ref_count(), 1);
    }

    #[test]
    fn test_gc_stats_monotonic() {
        let mut guest = GuestRuntime::new();
        let before = guest.stats().collections_run;

        guest.force_collect();
        guest.force_collect();

        assert_eq!(guest.stats().collections_run, before + 2);
    }

    #[test]
    #[should_panic(expected = "dangling guest reference")]
    fn test_dangling_reference_panics() {
        let mut guest = GuestRuntime::new();
        let v = guest.alloc(GuestValue::Int(1));
        let r = v.get();
        drop(v);
        guest.force_collect();

        let _ = guest.get(r);
    }
}

#[cfg(test)]
mod fault_tests {
    use super::*;

    #[test]
    fn test_raise_and_take() {
        let mut guest = GuestRuntime::new();
        assert!(!guest.has_fault());

        guest.raise(GuestError::new("boom"));
        assert!(guest.has_fault());

        let fault = guest.take_fault().unwrap();
        assert_eq!(fault.message, "boom");
        assert!(!guest.has_fault());
    }

    #[test]
    fn test_take_fault_empty() {
        let mut guest = GuestRuntime::new();
        assert!(guest.take_fault().is_none());
    }

    #[test]
    fn test_first_fault_wins() {
        let mut guest = GuestRuntime::new();
        guest.raise(GuestError::new("first"));
        guest.raise(GuestError::new("second"));

        let fault = guest.take_fault().unwrap();
        assert_eq!(fault.message, "first");
        assert!(!guest.has_fault());
    }

    #[test]
    fn test_backtrace_innermost_first() {
        let mut guest = GuestRuntime::new();
        guest.push_frame(Rc::from("outer"));
        guest.push_frame(Rc::from("inner"));

        guest.raise(GuestError::new("boom"));
        let fault = guest.take_fault().unwrap();
        assert_eq!(fault.backtrace, vec!["inner".to_string(), "outer".to_string()]);

        guest.pop_frame();
        guest.pop_frame();
        assert_eq!(guest.frame_depth(), 0);
    }
}

#[cfg(test)]
mod function_tests {
    use super::*;

    #[test]
    fn test_register_fn_named() {
        let mut guest = GuestRuntime::new();
        let f = guest.register_fn("double", |_b, _args| Err(GuestError::new("unused")));

        assert_eq!(guest.kind_name(f.get()), "function");
        let func = guest.function_at(f.get()).unwrap();
        assert_eq!(func.name(), "double");
    }

    #[test]
    fn test_function_at_non_function() {
        let mut guest = GuestRuntime::new();
        let v = guest.alloc(GuestValue::Int(1));

        assert!(guest.function_at(v.get()).is_none());
    }
}
