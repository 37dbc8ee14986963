#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::future::Future;
    use std::rc::Rc;

    use futures::channel::oneshot;
    use futures::executor::LocalPool;
    use web_time::Duration;

    use crate::mutation::PendingMutations;
    use crate::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Post {
        likes: u32,
        liked: bool,
    }

    fn post(likes: u32) -> Post {
        Post {
            likes,
            liked: false,
        }
    }

    fn toggle_like(idx: usize) -> Mutation<Vec<Post>> {
        Mutation::new("toggle_like", move |posts: &Vec<Post>| {
            let mut posts = posts.clone();
            if let Some(p) = posts.get_mut(idx) {
                if p.liked {
                    p.likes -= 1;
                } else {
                    p.likes += 1;
                }
                p.liked = !p.liked;
            }
            posts
        })
    }

    struct Harness {
        pool: LocalPool,
        store: ResourceStore,
        clock: ManualClock,
    }

    fn harness() -> Harness {
        let _ = env_logger::builder().is_test(true).try_init();
        let pool = LocalPool::new();
        let clock = ManualClock::new();
        let store = ResourceStore::builder(pool.spawner())
            .clock(clock.clone())
            .build();
        Harness { pool, store, clock }
    }

    type Log<T> = Rc<RefCell<Vec<ResourceState<T>>>>;

    fn recorder<T: 'static>() -> (Log<T>, impl Fn(&ResourceState<T>) + 'static) {
        let log: Log<T> = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        (log, move |s: &ResourceState<T>| sink.borrow_mut().push(s.clone()))
    }

    fn deferred<T: 'static>() -> (
        oneshot::Sender<Result<T, FetchError>>,
        impl Future<Output = Result<T, FetchError>> + 'static,
    ) {
        let (tx, rx) = oneshot::channel();
        let fut = async move {
            rx.await
                .unwrap_or_else(|_| Err(FetchError::new("fetch canceled")))
        };
        (tx, fut)
    }

    fn ready<T: 'static>(value: T) -> impl Future<Output = Result<T, FetchError>> + 'static {
        async move { Ok(value) }
    }

    /// Requests `key` and drives the fetch to completion.
    fn load<T: 'static>(h: &mut Harness, key: &ResourceKey<T>, value: T) -> Subscription {
        let sub = h
            .store
            .request(key, move || ready(value), FetchOptions::default(), |_| {});
        h.pool.run_until_stalled();
        sub
    }

    #[test]
    fn test_concurrent_requests_share_one_fetch() {
        let mut h = harness();
        let key: ResourceKey<u32> = ResourceKey::new("communities:all");
        let calls = Rc::new(Cell::new(0));

        let mut logs = Vec::new();
        let mut subs = Vec::new();
        for _ in 0..5 {
            let calls = calls.clone();
            let (log, on_change) = recorder();
            subs.push(h.store.request(
                &key,
                move || {
                    calls.set(calls.get() + 1);
                    ready(7)
                },
                FetchOptions::default(),
                on_change,
            ));
            logs.push(log);
        }

        assert_eq!(calls.get(), 1);
        assert!(h.store.is_fetching(&key));

        h.pool.run_until_stalled();

        assert!(!h.store.is_fetching(&key));
        assert_eq!(calls.get(), 1);
        for log in &logs {
            let last = log.borrow().last().cloned();
            assert_eq!(last.and_then(|s| s.value().map(|v| **v)), Some(7));
        }
    }

    #[test]
    fn test_loading_and_error_keep_last_value() {
        let mut h = harness();
        let key: ResourceKey<u32> = ResourceKey::new("user:42");
        let _first = load(&mut h, &key, 1);

        let (tx, fut) = deferred();
        let (log, on_change) = recorder();
        let _sub = h
            .store
            .request(&key, move || fut, FetchOptions::force(), on_change);

        assert_eq!(
            h.store.peek(&key),
            ResourceState::Loading {
                previous: Some(Rc::new(1))
            }
        );

        tx.send(Err(FetchError::new("offline"))).unwrap();
        h.pool.run_until_stalled();

        let expected = ResourceState::Error {
            message: "offline".to_string(),
            last_known: Some(Rc::new(1)),
        };
        assert_eq!(h.store.peek(&key), expected);
        assert_eq!(log.borrow().last(), Some(&expected));
    }

    #[test]
    fn test_error_is_not_retried_until_forced() {
        let mut h = harness();
        let key: ResourceKey<u32> = ResourceKey::new("room:r1");
        let calls = Rc::new(Cell::new(0));
        let fetcher = |calls: &Rc<Cell<u32>>| {
            let calls = calls.clone();
            move || {
                calls.set(calls.get() + 1);
                async { Err::<u32, _>("server error") }
            }
        };

        let _a = h
            .store
            .request(&key, fetcher(&calls), FetchOptions::default(), |_| {});
        h.pool.run_until_stalled();
        assert!(h.store.peek(&key).is_error());

        let _b = h
            .store
            .request(&key, fetcher(&calls), FetchOptions::default(), |_| {});
        h.pool.run_until_stalled();
        assert_eq!(calls.get(), 1);

        let _c = h
            .store
            .request(&key, fetcher(&calls), FetchOptions::force(), |_| {});
        h.pool.run_until_stalled();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_request_refetches_after_ttl() {
        let mut h = harness();
        let key: ResourceKey<u32> = ResourceKey::new("matches:upcoming");
        let calls = Rc::new(Cell::new(0));
        let request = |h: &mut Harness, calls: &Rc<Cell<u32>>| {
            let calls = calls.clone();
            let sub = h.store.request(
                &key,
                move || {
                    calls.set(calls.get() + 1);
                    ready(calls.get())
                },
                FetchOptions::ttl(Duration::from_secs(1)),
                |_| {},
            );
            h.pool.run_until_stalled();
            sub
        };

        let _a = request(&mut h, &calls);
        let _b = request(&mut h, &calls);
        assert_eq!(calls.get(), 1);

        h.clock.advance(Duration::from_secs(2));
        let _c = request(&mut h, &calls);
        assert_eq!(calls.get(), 2);
        assert_eq!(h.store.peek(&key).value().map(|v| **v), Some(2));
    }

    #[test]
    fn test_invalidate_keeps_value_and_refetches() {
        let mut h = harness();
        let key: ResourceKey<u32> = ResourceKey::new("feed:c1");
        let _sub = load(&mut h, &key, 1);

        h.store.invalidate(&key);
        assert_eq!(h.store.peek(&key).value().map(|v| **v), Some(1));

        let _again = load(&mut h, &key, 2);
        assert_eq!(h.store.peek(&key).value().map(|v| **v), Some(2));
    }

    #[test]
    fn test_invalidate_prefix() {
        let mut h = harness();
        let c1: ResourceKey<u32> = ResourceKey::new("feed:c1");
        let c2: ResourceKey<u32> = ResourceKey::new("feed:c2");
        let user: ResourceKey<u32> = ResourceKey::new("user:1");
        let _subs = [
            load(&mut h, &c1, 1),
            load(&mut h, &c2, 1),
            load(&mut h, &user, 1),
        ];

        assert_eq!(h.store.invalidate_prefix("feed:"), 2);

        let _c1 = load(&mut h, &c1, 10);
        let _user = load(&mut h, &user, 10);
        assert_eq!(h.store.peek(&c1).value().map(|v| **v), Some(10));
        assert_eq!(h.store.peek(&user).value().map(|v| **v), Some(1));
    }

    #[test]
    fn test_apply_then_revert_restores_value() {
        let mut h = harness();
        let key: ResourceKey<Vec<Post>> = ResourceKey::new("feed:c1");
        let _sub = load(&mut h, &key, vec![post(3), post(10)]);
        let before = h.store.peek(&key);

        let id = h.store.apply(&key, toggle_like(0)).unwrap();
        assert_ne!(h.store.peek(&key), before);

        h.store.revert(&key, id).unwrap();
        let after = h.store.peek(&key);
        assert_eq!(after, before);
        assert!(Rc::ptr_eq(
            after.value().unwrap(),
            before.value().unwrap()
        ));
    }

    #[test]
    fn test_reapplied_mutation_survives_refresh() {
        let mut h = harness();
        let key: ResourceKey<Vec<Post>> = ResourceKey::new("feed:c1");
        let _sub = load(&mut h, &key, vec![post(3), post(10)]);

        let id = h
            .store
            .apply(&key, toggle_like(1).reapply_on_refresh())
            .unwrap();

        let fresh = vec![post(5), post(12), post(1)];
        let expected = toggle_like(1).run(&fresh);
        let _refresh = h.store.request(
            &key,
            move || ready(fresh),
            FetchOptions::force(),
            |_| {},
        );
        h.pool.run_until_stalled();

        let state = h.store.peek(&key);
        assert_eq!(state.value().map(|v| (**v).clone()), Some(expected));
        assert_eq!(state.pending(), &[id]);
    }

    #[test]
    fn test_discarded_mutation_resolves_on_refresh() {
        let mut h = harness();
        let key: ResourceKey<Vec<Post>> = ResourceKey::new("feed:c1");
        let _sub = load(&mut h, &key, vec![post(3)]);

        let id = h.store.apply(&key, toggle_like(0)).unwrap();
        let _refresh = h.store.request(
            &key,
            || ready(vec![post(8)]),
            FetchOptions::force(),
            |_| {},
        );
        h.pool.run_until_stalled();

        let state = h.store.peek(&key);
        assert_eq!(state.value().map(|v| (**v).clone()), Some(vec![post(8)]));
        assert!(state.pending().is_empty());
        assert!(matches!(
            h.store.revert(&key, id),
            Err(StoreError::MutationConflict { .. })
        ));
    }

    #[test]
    fn test_feed_like_scenario() {
        let mut h = harness();
        let key: ResourceKey<Vec<Post>> = ResourceKey::new("feed:c1");
        let (log, on_change) = recorder();
        let _sub = h.store.request(
            &key,
            || ready(vec![post(3), post(10)]),
            FetchOptions::default(),
            on_change,
        );
        h.pool.run_until_stalled();

        h.store
            .apply(&key, toggle_like(0).reapply_on_refresh())
            .unwrap();

        // observed in the same tick, before any network activity
        let seen = log.borrow().last().cloned().unwrap();
        let posts = seen.value().unwrap();
        assert_eq!(posts.iter().map(|p| p.likes).collect::<Vec<_>>(), [4, 10]);
        assert!(posts[0].liked);

        let _refresh = h.store.request(
            &key,
            || ready(vec![post(3), post(10)]),
            FetchOptions::force(),
            |_| {},
        );
        h.pool.run_until_stalled();

        let state = h.store.peek(&key);
        let posts = state.value().unwrap();
        assert_eq!(posts.iter().map(|p| p.likes).collect::<Vec<_>>(), [4, 10]);
        assert!(posts[0].liked);
    }

    #[test]
    fn test_apply_requires_success() {
        let mut h = harness();
        let key: ResourceKey<Vec<Post>> = ResourceKey::new("feed:c9");

        let err = h.store.apply(&key, toggle_like(0)).unwrap_err();
        assert_eq!(
            err,
            StoreError::InvalidState {
                key: "feed:c9".into(),
                state: "idle"
            }
        );
        assert!(h.store.peek(&key).is_idle());

        let (_tx, fut) = deferred();
        let _sub = h
            .store
            .request(&key, move || fut, FetchOptions::default(), |_| {});
        h.pool.run_until_stalled();
        assert!(matches!(
            h.store.apply(&key, toggle_like(0)),
            Err(StoreError::InvalidState {
                state: "loading",
                ..
            })
        ));
        assert!(h.store.peek(&key).is_loading());
    }

    #[test]
    fn test_revert_replays_on_fetched_value() {
        let mut h = harness();
        let key: ResourceKey<i64> = ResourceKey::new("campaign:7");
        let _sub = load(&mut h, &key, 1);

        let add = h
            .store
            .apply(&key, Mutation::new("add", |v: &i64| v + 1))
            .unwrap();
        h.store
            .apply(&key, Mutation::new("scale", |v: &i64| v * 10))
            .unwrap();
        assert_eq!(h.store.peek(&key).value().map(|v| **v), Some(20));

        h.store.revert(&key, add).unwrap();
        assert_eq!(h.store.peek(&key).value().map(|v| **v), Some(10));
    }

    #[test]
    fn test_revert_while_loading_rewrites_previous() {
        let mut h = harness();
        let key: ResourceKey<i64> = ResourceKey::new("campaign:8");
        let _sub = load(&mut h, &key, 1);
        let id = h
            .store
            .apply(&key, Mutation::new("add", |v: &i64| v + 1))
            .unwrap();

        let (_tx, fut) = deferred();
        let _refresh = h
            .store
            .request(&key, move || fut, FetchOptions::force(), |_| {});
        assert_eq!(h.store.pending_mutations(&key), vec![id]);

        h.store.revert(&key, id).unwrap();
        assert_eq!(
            h.store.peek(&key),
            ResourceState::Loading {
                previous: Some(Rc::new(1))
            }
        );
    }

    #[test]
    fn test_confirm_folds_into_fetched_value() {
        let mut h = harness();
        let key: ResourceKey<Vec<Post>> = ResourceKey::new("feed:c1");
        let _sub = load(&mut h, &key, vec![post(3)]);

        let id = h
            .store
            .apply(&key, toggle_like(0).reapply_on_refresh())
            .unwrap();
        let optimistic = h.store.peek(&key);

        h.store.confirm(&key, id).unwrap();
        let confirmed = h.store.peek(&key);
        assert_eq!(confirmed.value(), optimistic.value());
        assert!(confirmed.pending().is_empty());

        // a later revert has nothing to withdraw
        assert!(h.store.revert(&key, id).is_err());
        assert_eq!(h.store.peek(&key), confirmed);
    }

    #[test]
    fn test_revert_unknown_mutation_is_conflict() {
        let mut h = harness();
        let key: ResourceKey<u32> = ResourceKey::new("user:1");
        let _sub = load(&mut h, &key, 1);
        let before = h.store.peek(&key);

        let err = h.store.revert(&key, MutationId(99)).unwrap_err();
        assert_eq!(
            err,
            StoreError::MutationConflict {
                key: "user:1".into(),
                id: MutationId(99)
            }
        );
        assert_eq!(h.store.peek(&key), before);
    }

    #[test]
    fn test_eviction_after_ttl() {
        let mut h = harness();
        let key: ResourceKey<u32> = ResourceKey::new("room:r2");
        let start = h.clock.now();
        let sub = h.store.request(
            &key,
            || ready(3),
            FetchOptions::ttl(Duration::from_secs(10)),
            |_| {},
        );
        h.pool.run_until_stalled();
        assert_eq!(h.store.peek(&key), ResourceState::success(3, start));

        sub.unsubscribe();
        h.clock.set(start + Duration::from_secs(5));
        assert!(h.store.peek(&key).is_success());

        h.clock.set(start + Duration::from_secs(10));
        assert!(h.store.peek(&key).is_idle());
        assert!(h.store.is_empty());
    }

    #[test]
    fn test_expired_keys_dropped_on_next_subscription() {
        let mut h = harness();
        for i in 0..100 {
            let key: ResourceKey<u32> = ResourceKey::new(format!("user:{i}"));
            let sub = h.store.request(
                &key,
                move || ready(i),
                FetchOptions::ttl(Duration::from_secs(1)),
                |_| {},
            );
            h.pool.run_until_stalled();
            drop(sub);
        }
        assert_eq!(h.store.len(), 100);

        h.clock.advance(Duration::from_secs(3600));
        // expired entries already read as gone
        assert_eq!(h.store.len(), 0);
        assert!(!h.store.contains(&ResourceKey::<u32>::new("user:5")));

        let _feed = load(&mut h, &ResourceKey::<u32>::new("feed:c1"), 1);
        assert_eq!(h.store.len(), 1);
        assert_eq!(h.store.sweep(), 0);
    }

    #[test]
    fn test_sweep_skips_observed_and_in_flight() {
        let mut h = harness();
        let watched: ResourceKey<u32> = ResourceKey::new("a");
        let loading: ResourceKey<u32> = ResourceKey::new("b");
        let idle: ResourceKey<u32> = ResourceKey::new("c");

        let _watched = load(&mut h, &watched, 1);
        let (_tx, fut) = deferred();
        drop(
            h.store
                .request(&loading, move || fut, FetchOptions::default(), |_| {}),
        );
        drop(load(&mut h, &idle, 1));

        h.clock.advance(Duration::from_secs(60));
        assert_eq!(h.store.sweep(), 1);
        assert!(h.store.contains(&watched));
        assert!(h.store.contains(&loading));
        assert!(!h.store.contains(&idle));
    }

    #[test]
    fn test_result_without_subscribers_is_stored_silently() {
        let mut h = harness();
        let key: ResourceKey<u32> = ResourceKey::new("user:9");
        let (tx, fut) = deferred();
        let (log, on_change) = recorder();
        let sub = h
            .store
            .request(&key, move || fut, FetchOptions::default(), on_change);
        sub.unsubscribe();

        tx.send(Ok(5)).unwrap();
        h.pool.run_until_stalled();

        assert_eq!(h.store.peek(&key).value().map(|v| **v), Some(5));
        assert!(log.borrow().iter().all(|s| !s.is_success()));
    }

    #[test]
    fn test_subscribers_notified_in_order() {
        let mut h = harness();
        let key: ResourceKey<u32> = ResourceKey::new("feed:c1");
        let order = Rc::new(RefCell::new(Vec::new()));
        let listener = |name: &'static str| {
            let order = order.clone();
            move |s: &ResourceState<u32>| order.borrow_mut().push((name, s.label()))
        };

        let _a = h.store.request(
            &key,
            || ready(1),
            FetchOptions::default(),
            listener("a"),
        );
        let _b = h.store.subscribe(&key, listener("b"));
        let _c = h.store.subscribe(&key, listener("c"));
        order.borrow_mut().clear();

        h.pool.run_until_stalled();
        assert_eq!(
            *order.borrow(),
            [("a", "success"), ("b", "success"), ("c", "success")]
        );
    }

    #[test]
    fn test_subscribe_receives_current_state() {
        let mut h = harness();
        let key: ResourceKey<u32> = ResourceKey::new("user:3");
        let _sub = load(&mut h, &key, 3);

        let (log, on_change) = recorder();
        let _watch = h.store.subscribe(&key, on_change);
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0].value().map(|v| **v), Some(3));
    }

    #[test]
    fn test_unsubscribe_during_delivery() {
        let mut h = harness();
        let key: ResourceKey<u32> = ResourceKey::new("room:r1");
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let victim_calls = Rc::new(Cell::new(0));

        let _killer = h.store.subscribe(&key, {
            let victim = victim.clone();
            move |s: &ResourceState<u32>| {
                if s.is_loading() {
                    victim.borrow_mut().take();
                }
            }
        });
        *victim.borrow_mut() = Some(h.store.subscribe(&key, {
            let calls = victim_calls.clone();
            move |_: &ResourceState<u32>| calls.set(calls.get() + 1)
        }));
        assert_eq!(victim_calls.get(), 1);

        let _sub = load(&mut h, &key, 1);
        assert_eq!(victim_calls.get(), 1);
        assert_eq!(h.store.subscriber_count(), 2);
    }

    #[test]
    fn test_mutation_from_callback_is_delivered_after_current() {
        let mut h = harness();
        let key: ResourceKey<i64> = ResourceKey::new("campaign:1");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let applied = Rc::new(Cell::new(false));

        let _first = h.store.subscribe(&key, {
            let store = h.store.clone();
            let key = key.clone();
            let seen = seen.clone();
            let applied = applied.clone();
            move |s: &ResourceState<i64>| {
                seen.borrow_mut().push(("first", s.value().map(|v| **v)));
                if s.is_success() && !applied.replace(true) {
                    store
                        .apply(&key, Mutation::new("bump", |v: &i64| v + 1))
                        .unwrap();
                }
            }
        });
        let _second = h.store.subscribe(&key, {
            let seen = seen.clone();
            move |s: &ResourceState<i64>| seen.borrow_mut().push(("second", s.value().map(|v| **v)))
        });
        let _load = load(&mut h, &key, 1);

        let tail: Vec<_> = seen.borrow().iter().rev().take(4).rev().cloned().collect();
        assert_eq!(
            tail,
            [
                ("first", Some(1)),
                ("second", Some(1)),
                ("first", Some(2)),
                ("second", Some(2)),
            ]
        );
    }

    #[test]
    fn test_scope_dispose_unsubscribes() {
        let mut h = harness();
        let key: ResourceKey<u32> = ResourceKey::new("communities:all");
        let screen = Scope::new();
        let tab = screen.child();

        h.store
            .request(&key, || ready(1), FetchOptions::default(), |_| {})
            .bind(&screen);
        h.store.subscribe(&key, |_| {}).bind(&tab);
        assert_eq!(screen.disposer_count(), 1);
        assert_eq!(tab.disposer_count(), 1);
        h.pool.run_until_stalled();
        assert_eq!(h.store.subscriber_count(), 2);

        screen.dispose();
        assert_eq!(h.store.subscriber_count(), 0);
    }

    #[test]
    fn test_detached_subscription_stays() {
        let h = harness();
        let key: ResourceKey<u32> = ResourceKey::new("user:me");
        h.store.subscribe(&key, |_| {}).detach();
        assert_eq!(h.store.subscriber_count(), 1);
    }

    #[test]
    fn test_key_type_mismatch() {
        let mut h = harness();
        let _sub = load(&mut h, &ResourceKey::<u32>::new("x"), 1);
        let other: ResourceKey<String> = ResourceKey::new("x");

        assert!(h.store.peek(&other).is_idle());
        assert_eq!(
            h.store
                .apply(&other, Mutation::new("noop", |s: &String| s.clone())),
            Err(StoreError::TypeMismatch { key: "x".into() })
        );
    }

    #[test]
    fn test_pending_replay_order() {
        let mut pending = PendingMutations::default();
        pending.push(MutationId(1), Mutation::new("add", |v: &i32| v + 2));
        pending.push(
            MutationId(2),
            Mutation::new("double", |v: &i32| v * 2).reapply_on_refresh(),
        );

        assert_eq!(*pending.replay(&Rc::new(1)), 6);
        assert_eq!(pending.retain_reapplied(), 1);
        assert_eq!(pending.ids().as_slice(), &[MutationId(2)]);
        assert_eq!(*pending.replay(&Rc::new(1)), 2);
    }

    #[test]
    fn test_reconcile_builders() {
        let m = Mutation::new("double", |v: &i32| v * 2).reapply_on_refresh();
        assert_eq!(m.reconcile(), Reconcile::ReapplyOnRefresh);
        let m = m.discard_on_refresh();
        assert_eq!(m.reconcile(), Reconcile::DiscardOnRefresh);
        let m = m.with_reconcile(Reconcile::ReapplyOnRefresh);
        assert_eq!(m.reconcile(), Reconcile::ReapplyOnRefresh);
        assert_eq!(m.name(), "double");
        assert_eq!(m.run(&4), 8);
    }

    fn add(n: i64) -> Mutation<i64> {
        Mutation::new("add", move |v: &i64| v + n)
    }

    fn times(n: i64) -> Mutation<i64> {
        Mutation::new("times", move |v: &i64| v * n)
    }

    #[test]
    fn test_confirm_keeps_submission_order_for_revert() {
        let mut h = harness();
        let key: ResourceKey<i64> = ResourceKey::new("campaign:7");
        let _sub = load(&mut h, &key, 1);

        let m1 = h.store.apply(&key, add(1)).unwrap();
        let m2 = h.store.apply(&key, times(10)).unwrap();
        let m3 = h.store.apply(&key, Mutation::new("noop", |v: &i64| *v)).unwrap();
        assert_eq!(h.store.peek(&key).value().map(|v| **v), Some(20));

        h.store.confirm(&key, m2).unwrap();
        assert_eq!(h.store.peek(&key).pending(), &[m1, m3]);
        assert_eq!(h.store.peek(&key).value().map(|v| **v), Some(20));

        // withdrawing a no-op leaves the value alone
        h.store.revert(&key, m3).unwrap();
        assert_eq!(h.store.peek(&key).value().map(|v| **v), Some(20));

        // m2 still runs after m1 is gone: 1 * 10
        h.store.revert(&key, m1).unwrap();
        assert_eq!(h.store.peek(&key).value().map(|v| **v), Some(10));
        assert!(h.store.peek(&key).pending().is_empty());
        assert!(h.store.pending_mutations(&key).is_empty());
    }

    #[test]
    fn test_confirmed_mutation_dropped_on_refresh() {
        let mut h = harness();
        let key: ResourceKey<i64> = ResourceKey::new("campaign:8");
        let _sub = load(&mut h, &key, 1);

        let m1 = h.store.apply(&key, add(1).reapply_on_refresh()).unwrap();
        let m2 = h.store.apply(&key, times(10).reapply_on_refresh()).unwrap();
        h.store.confirm(&key, m2).unwrap();
        assert!(h.store.confirm(&key, m2).is_err());
        assert!(h.store.revert(&key, m2).is_err());

        // the server already applied m2 (5 * 10), m1 is still replayed on top
        h.store.invalidate(&key);
        let _again = h
            .store
            .request(&key, || ready(50), FetchOptions::default(), |_| {});
        h.pool.run_until_stalled();
        let state = h.store.peek(&key);
        assert_eq!(state.value().map(|v| **v), Some(51));
        assert_eq!(state.pending(), &[m1]);
    }

    #[test]
    fn test_pending_folds_confirmed_prefix() {
        let mut pending = PendingMutations::default();
        pending.push(MutationId(1), add(1));
        pending.push(MutationId(2), times(10));
        let base = Rc::new(1);

        assert!(pending.confirm(MutationId(2)).is_some());
        assert!(pending.fold_confirmed(&base).is_none());
        assert_eq!(*pending.replay(&base), 20);

        assert!(pending.confirm(MutationId(1)).is_some());
        let folded = pending.fold_confirmed(&base).unwrap();
        assert_eq!(*folded, 20);
        assert!(pending.ids().is_empty());
        assert!(Rc::ptr_eq(&pending.replay(&folded), &folded));
    }

    #[test]
    fn test_fetch_options() {
        assert_eq!(FetchOptions::default().ttl, None);
        assert!(FetchOptions::force().force_refresh);
        let o = FetchOptions::ttl(Duration::from_secs(3)).with_force_refresh(true);
        assert_eq!(o.ttl, Some(Duration::from_secs(3)));
        assert!(o.force_refresh);
        assert!(StoreConfig::short_lived().default_ttl < StoreConfig::default().default_ttl);
    }
}
