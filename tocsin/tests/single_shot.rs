use std::{
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc, Barrier,
	},
	thread,
};

use tocsin::Signal;

use _validator::Validator;

#[test]
fn runs_once_then_disconnects() {
	static V: Validator<i32> = Validator::new();
	let v = &V;

	let signal = Signal::<(i32,)>::new();
	let connection = signal.connect_once(move |value: i32| v.push(value));
	assert!(connection.is_connected());
	assert_eq!(signal.slot_count(), 1);

	signal.emit((1,));
	signal.emit((2,));
	signal.emit((3,));

	v.expect([1]);
	assert!(!connection.is_connected());
	assert!(signal.is_empty());
}

#[test]
fn partial_arguments() {
	static V: Validator<i32> = Validator::new();
	let v = &V;

	let signal = Signal::<(i32, String)>::new();
	signal.connect_once(move |id: i32| v.push(id));
	signal.connect_once(move || v.push(-1));

	signal.emit((7, "seven".to_string()));
	signal.emit((8, "eight".to_string()));
	v.expect([7, -1]);
}

#[test]
fn blocked_single_shot_waits() {
	static V: Validator<i32> = Validator::new();
	let v = &V;

	let signal = Signal::<(i32,)>::new();
	let connection = signal.connect_once(move |value: i32| v.push(value));

	connection.block();
	signal.emit((1,));
	assert!(connection.is_connected());

	connection.unblock();
	signal.emit((2,));
	signal.emit((3,));
	v.expect([2]);
}

#[test]
fn disconnected_before_firing() {
	static CALLS: AtomicUsize = AtomicUsize::new(0);

	let signal = Signal::<()>::new();
	let connection = signal.connect_once(|| {
		CALLS.fetch_add(1, Ordering::Relaxed);
	});
	connection.disconnect();

	signal.emit(());
	assert_eq!(CALLS.load(Ordering::Relaxed), 0);
}

#[test]
fn reentrant_emission_does_not_fire_twice() {
	static CALLS: AtomicUsize = AtomicUsize::new(0);

	let signal = Arc::new(Signal::<()>::new());
	let weak = Arc::downgrade(&signal);
	signal.connect_once(move || {
		CALLS.fetch_add(1, Ordering::Relaxed);
		if let Some(signal) = weak.upgrade() {
			signal.emit(());
		}
	});

	signal.emit(());
	signal.emit(());
	assert_eq!(CALLS.load(Ordering::Relaxed), 1);
}

#[test]
fn concurrent_emissions_fire_exactly_once() {
	const THREADS: usize = 16;

	for _ in 0..50 {
		let calls = Arc::new(AtomicUsize::new(0));
		let signal = Arc::new(Signal::<(usize,)>::new());
		signal.connect_once({
			let calls = Arc::clone(&calls);
			move |_: usize| {
				calls.fetch_add(1, Ordering::SeqCst);
			}
		});

		let barrier = Arc::new(Barrier::new(THREADS));
		let handles: Vec<_> = (0..THREADS)
			.map(|i| {
				let signal = Arc::clone(&signal);
				let barrier = Arc::clone(&barrier);
				thread::spawn(move || {
					barrier.wait();
					signal.emit((i,));
				})
			})
			.collect();
		for handle in handles {
			handle.join().unwrap();
		}

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert!(signal.is_empty());
	}
}

#[test]
fn many_single_shots_under_concurrency() {
	const SLOTS: usize = 100;
	const THREADS: usize = 8;

	let calls = Arc::new(AtomicUsize::new(0));
	let signal = Arc::new(Signal::<()>::new());
	for _ in 0..SLOTS {
		let calls = Arc::clone(&calls);
		signal.connect_once(move || {
			calls.fetch_add(1, Ordering::SeqCst);
		});
	}

	let barrier = Arc::new(Barrier::new(THREADS));
	let handles: Vec<_> = (0..THREADS)
		.map(|_| {
			let signal = Arc::clone(&signal);
			let barrier = Arc::clone(&barrier);
			thread::spawn(move || {
				barrier.wait();
				for _ in 0..10 {
					signal.emit(());
				}
			})
		})
		.collect();
	for handle in handles {
		handle.join().unwrap();
	}

	assert_eq!(calls.load(Ordering::SeqCst), SLOTS);
	assert!(signal.is_empty());
}
