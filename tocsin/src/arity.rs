//! Argument-prefix adaptation.
//!
//! A [`Signal<Args>`](`crate::Signal`) always dispatches its full argument tuple,
//! but a slot may accept any prefix of it. For `Signal<(i32, f64, String)>`, all of
//! `|| ..`, `|a: i32| ..`, `|a: i32, b: f64| ..` and `|a: i32, b: f64, c: String| ..`
//! are valid slots. The trailing arguments are dropped at call time.
//!
//! Implementations exist for argument tuples of up to six elements.
//!
//! # Type inference
//!
//! The prefix length is chosen through the `Marker` type parameter, which the compiler
//! can only pick once the callback's parameter types are known. Closure parameters
//! therefore need type annotations unless the closure takes no arguments.
//!
//! A callback that fits no prefix doesn't implement these traits, so connecting it is
//! a compile-time error:
//!
//! ```compile_fail
//! use tocsin::Signal;
//!
//! let signal = Signal::<(i32,)>::new();
//! signal.connect(|text: String| drop(text));
//! ```

/// The type-erased form of every slot of a [`Signal<Args>`](`crate::Signal`).
pub type Callback<Args> = Box<dyn 'static + Send + Sync + Fn(Args)>;

/// A method slot before it is bound to its receiver.
pub type MethodCallback<R, Args> = Box<dyn 'static + Send + Sync + Fn(&R, Args)>;

/// Callbacks that can be invoked with a prefix of `Args`.
///
/// `Marker` is `fn(A1, …, Ak)` for the accepted prefix `A1, …, Ak`.
/// You shouldn't need to name it.
pub trait IntoSlot<Args, Marker>: 'static + Send + Sync + Sized {
	/// Erases the callback into one that accepts the full argument tuple.
	fn into_callback(self) -> Callback<Args>;
}

/// Methods (or other callables with a leading `&R` parameter) that can be invoked
/// with a receiver and a prefix of `Args`.
///
/// Plain method paths like `Receiver::on_value` qualify.
pub trait IntoMethodSlot<R: ?Sized, Args, Marker>: 'static + Send + Sync + Sized {
	/// Erases the callback into one that accepts the receiver and the full argument tuple.
	fn into_method_callback(self) -> MethodCallback<R, Args>;
}

/// Implements both traits for one argument list and one of its prefixes.
macro_rules! impl_prefix {
	([$($all:ident $a:ident),*] [$($pre:ident $p:ident),*]) => {
		impl<F, $($all),*> IntoSlot<($($all,)*), fn($($pre),*)> for F
		where
			F: 'static + Send + Sync + Fn($($pre),*),
			$($all: 'static,)*
		{
			fn into_callback(self) -> Callback<($($all,)*)> {
				Box::new(move |args: ($($all,)*)| {
					let ($($p,)* ..) = args;
					(self)($($p),*)
				})
			}
		}

		impl<F, R: ?Sized + 'static, $($all),*> IntoMethodSlot<R, ($($all,)*), fn($($pre),*)> for F
		where
			F: 'static + Send + Sync + Fn(&R, $($pre),*),
			$($all: 'static,)*
		{
			fn into_method_callback(self) -> MethodCallback<R, ($($all,)*)> {
				Box::new(move |receiver: &R, args: ($($all,)*)| {
					let ($($p,)* ..) = args;
					(self)(receiver, $($p),*)
				})
			}
		}
	};
}

/// Walks the prefixes of one argument list, shortest first.
macro_rules! impl_prefixes {
	([$($all:ident $a:ident),*] [$($pre:ident $p:ident),*] []) => {
		impl_prefix!([$($all $a),*] [$($pre $p),*]);
	};
	([$($all:ident $a:ident),*] [$($pre:ident $p:ident),*] [$next:ident $n:ident $(, $rest:ident $r:ident)*]) => {
		impl_prefix!([$($all $a),*] [$($pre $p),*]);
		impl_prefixes!([$($all $a),*] [$($pre $p,)* $next $n] [$($rest $r),*]);
	};
}

/// Walks the argument lists, longest first.
macro_rules! impl_arities {
	() => {
		impl_prefixes!([] [] []);
	};
	($first:ident $f:ident $(, $rest:ident $r:ident)*) => {
		impl_prefixes!([$first $f $(, $rest $r)*] [] [$first $f $(, $rest $r)*]);
		impl_arities!($($rest $r),*);
	};
}

impl_arities!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
