//! Structural unification with tentative bindings.
//!
//! The [`Unifier`] writes bindings into the scratch half of each slot and
//! remembers them. A successful unification is made permanent with
//! [`Unifier::commit`], which also trails each binding on the topmost
//! choice point; a failed one is rolled back so that no variable touched
//! during the attempt stays bound.

use crate::{ChoiceStack, FrameId, Frames, PrologError, Term, VarRef};
use log::trace;

/// Pending bindings of an in-progress unification.
#[derive(Debug, Default)]
pub struct Unifier {
    pending: Vec<VarRef>,
}

impl Unifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tentative bindings not yet committed.
    #[inline]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Unifies `x` read in frame `fx` with `y` read in frame `fy`.
    ///
    /// On `Ok(true)` the bindings stay tentative until [`commit`](Self::commit).
    /// On `Ok(false)` or an error they have already been rolled back.
    pub fn unify(
        &mut self,
        frames: &mut Frames,
        x: &Term,
        fx: Option<FrameId>,
        y: &Term,
        fy: Option<FrameId>,
    ) -> Result<bool, PrologError> {
        let result = self.exec(frames, x, fx, y, fy);
        if !matches!(result, Ok(true)) {
            self.rollback(frames);
        }
        result
    }

    fn exec(
        &mut self,
        frames: &mut Frames,
        x: &Term,
        fx: Option<FrameId>,
        y: &Term,
        fy: Option<FrameId>,
    ) -> Result<bool, PrologError> {
        let mut x = x.clone();
        let mut y = y.clone();
        let (mut fx, mut fy) = (fx, fy);
        loop {
            if x.is_wildcard() || y.is_wildcard() {
                return Ok(true);
            }
            let dx = frames.bind_opt(&frames.tentative(&x, fx), fx);
            let dy = frames.bind_opt(&frames.tentative(&y, fy), fy);
            if dx.same(&dy) {
                return Ok(true);
            }
            match (&dx, &dy) {
                (Term::Ref(rx), Term::Ref(ry)) => {
                    let ox = frames.ordinal(rx.frame());
                    let oy = frames.ordinal(ry.frame());
                    let older_x = if ox != oy { ox < oy } else { rx.id() < ry.id() };
                    if older_x {
                        self.substitute(frames, ry, dx.clone())?;
                    } else {
                        self.substitute(frames, rx, dy.clone())?;
                    }
                    return Ok(true);
                }
                (Term::Ref(rx), _) => {
                    self.substitute(frames, rx, dy.clone())?;
                    return Ok(true);
                }
                (_, Term::Ref(ry)) => {
                    self.substitute(frames, ry, dx.clone())?;
                    return Ok(true);
                }
                (Term::Thunk(t), _) => {
                    x = t.force()?;
                    fx = None;
                    y = dy.clone();
                    fy = None;
                    continue;
                }
                (_, Term::Thunk(t)) => {
                    y = t.force()?;
                    fy = None;
                    x = dx.clone();
                    fx = None;
                    continue;
                }
                _ => {}
            }
            let (Some((cx, gx)), Some((cy, gy))) = (dx.compound_in(None), dy.compound_in(None))
            else {
                return Ok(false);
            };
            if cx.arity() != cy.arity() || cx.name() != cy.name() {
                return Ok(false);
            }
            let (cx, cy) = (cx.clone(), cy.clone());
            let Some(last) = cx.arity().checked_sub(1) else {
                return Ok(true);
            };
            for (a, b) in cx.args()[..last].iter().zip(&cy.args()[..last]) {
                if !self.exec(frames, a, gx, b, gy)? {
                    return Ok(false);
                }
            }
            x = cx.args()[last].clone();
            y = cy.args()[last].clone();
            fx = gx;
            fy = gy;
        }
    }

    fn substitute(&mut self, frames: &mut Frames, var: &VarRef, value: Term) -> Result<(), PrologError> {
        if matches!(&value, Term::Ref(r) if r == var) {
            return Ok(());
        }
        match frames.slot_mut(var) {
            Some(slot) => {
                slot.scratch = Some(value);
                self.pending.push(var.clone());
                Ok(())
            }
            None => crate::bail!("binding a variable of a discarded frame: {:?}", var),
        }
    }

    /// Makes every pending binding permanent and trails it.
    pub fn commit(&mut self, frames: &mut Frames, choices: &mut ChoiceStack) {
        for var in self.pending.drain(..) {
            if let Some(slot) = frames.slot_mut(&var) {
                slot.value = slot.scratch.take();
                trace!(target: "hornet::unify", "{}#{} := {:?}", var.var().name(), var.frame(), slot.value);
            }
            choices.record(frames, var);
        }
    }

    /// Discards every pending binding.
    pub fn rollback(&mut self, frames: &mut Frames) {
        for var in self.pending.drain(..) {
            if let Some(slot) = frames.slot_mut(&var) {
                slot.scratch = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{func, list, Atom, Code, Var};
    use proptest::prelude::*;

    struct Fixture {
        frames: Frames,
        choices: ChoiceStack,
        frame: FrameId,
    }

    impl Fixture {
        fn new(locals: usize) -> Self {
            let mut frames = Frames::new();
            let frame = frames.push(1, None, Code::Succeed, None, locals, None);
            Fixture {
                frames,
                choices: ChoiceStack::new(),
                frame,
            }
        }

        fn unify(&mut self, x: &Term, y: &Term) -> bool {
            let mut unifier = Unifier::new();
            let ok = unifier
                .unify(&mut self.frames, x, Some(self.frame), y, Some(self.frame))
                .unwrap();
            if ok {
                unifier.commit(&mut self.frames, &mut self.choices);
            }
            ok
        }

        fn value(&self, t: &Term) -> Term {
            self.frames.unbind(&self.frames.bind(t, self.frame))
        }
    }

    fn v(id: u32, name: &str) -> Term {
        Term::Var(Var::indexed(id, Atom::new(name)))
    }

    #[test]
    fn unify_binds_both_sides() {
        let mut fx = Fixture::new(2);
        let (x, y) = (v(0, "X"), v(1, "Y"));
        assert!(fx.unify(&func!("f"; x.clone(), 1), &func!("f"; 2, y.clone())));
        assert_eq!(fx.value(&x), Term::int(2));
        assert_eq!(fx.value(&y), Term::int(1));
    }

    #[test]
    fn functor_mismatch_fails() {
        let mut fx = Fixture::new(1);
        let x = v(0, "X");
        assert!(!fx.unify(&func!("f"; x.clone(), 1), &func!("g"; x.clone(), 1)));
        assert!(!fx.unify(&func!("f"; 1), &func!("f"; 1, 2)));
        assert!(!fx.unify(&Term::int(1), &Term::float(1.0)));
    }

    #[test]
    fn failure_rolls_back_partial_bindings() {
        let mut fx = Fixture::new(2);
        let (x, y) = (v(0, "X"), v(1, "Y"));
        assert!(!fx.unify(&func!("f"; x.clone(), y.clone(), 1), &func!("f"; 1, 2, 3)));
        assert!(fx.value(&x).is_var());
        assert!(fx.value(&y).is_var());
    }

    #[test]
    fn wildcard_never_binds() {
        let mut fx = Fixture::new(1);
        let x = v(0, "X");
        assert!(fx.unify(&func!("f"; Term::var("_"), x.clone()), &func!("f"; 1, 2)));
        assert_eq!(fx.value(&x), Term::int(2));
    }

    #[test]
    fn shared_variable_is_consistent() {
        let mut fx = Fixture::new(1);
        let x = v(0, "X");
        assert!(!fx.unify(&func!("f"; x.clone(), x.clone()), &func!("f"; 1, 2)));
        assert!(fx.value(&x).is_var());
        assert!(fx.unify(&func!("f"; x.clone(), x.clone()), &func!("f"; 1, 1)));
    }

    #[test]
    fn variable_chains_and_self_binding() {
        let mut fx = Fixture::new(3);
        let (x, y, z) = (v(0, "X"), v(1, "Y"), v(2, "Z"));
        assert!(fx.unify(&x, &y));
        assert!(fx.unify(&y, &x));
        assert!(fx.unify(&y, &z));
        assert!(fx.unify(&z, &Term::atom("a")));
        assert_eq!(fx.value(&x), Term::atom("a"));
    }

    #[test]
    fn younger_variable_points_to_older() {
        let mut frames = Frames::new();
        let mut choices = ChoiceStack::new();
        let old = frames.push(1, None, Code::Succeed, None, 1, None);
        let young = frames.push(5, Some(old), Code::Succeed, None, 1, None);
        let x = v(0, "X");
        let mut unifier = Unifier::new();
        assert!(unifier.unify(&mut frames, &x, Some(young), &x, Some(old)).unwrap());
        unifier.commit(&mut frames, &mut choices);
        let young_ref = frames.bind(&x, young);
        let old_ref = frames.bind(&x, old);
        assert_eq!(frames.resolve(&young_ref), old_ref);
        assert_eq!(frames.resolve(&old_ref), old_ref);
    }

    #[test]
    fn long_lists_unify_iteratively() {
        let mut fx = Fixture::new(1);
        let x = v(0, "X");
        let a = Term::list_with_tail((0..100_000).map(Term::int), x.clone());
        let b = Term::list((0..100_001).map(Term::int));
        assert!(fx.unify(&a, &b));
        assert_eq!(fx.value(&x), list![100_000]);
    }

    #[test]
    fn thunks_are_forced() {
        let mut fx = Fixture::new(1);
        let x = v(0, "X");
        let lazy = Term::thunk(|| Ok(func!("g"; 7)));
        assert!(fx.unify(&func!("g"; x.clone()), &lazy));
        assert_eq!(fx.value(&x), Term::int(7));
    }

    fn arb_tree(leaf: BoxedStrategy<Term>) -> impl Strategy<Value = Term> {
        leaf.prop_recursive(3, 12, 3, |inner| {
            ("[fg]", prop::collection::vec(inner, 1..3))
                .prop_map(|(name, args)| Term::compound(name, args))
        })
    }

    fn arb_term() -> impl Strategy<Value = Term> {
        arb_tree(
            prop_oneof![
                (0i64..4).prop_map(Term::int),
                "[ab]".prop_map(Term::atom),
                (0u32..4).prop_map(|i| v(i, "V")),
            ]
            .boxed(),
        )
    }

    fn arb_ground() -> impl Strategy<Value = Term> {
        arb_tree(
            prop_oneof![(0i64..4).prop_map(Term::int), "[ab]".prop_map(Term::atom)].boxed(),
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]

        #[test]
        fn unification_is_symmetric(a in arb_term(), b in arb_ground()) {
            let mut left = Fixture::new(4);
            let mut right = Fixture::new(4);
            prop_assert_eq!(left.unify(&a, &b), right.unify(&b, &a));
        }

        #[test]
        fn unification_is_idempotent(a in arb_term(), b in arb_ground()) {
            let mut fx = Fixture::new(4);
            if fx.unify(&a, &b) {
                let mut unifier = Unifier::new();
                let frame = Some(fx.frame);
                prop_assert!(unifier.unify(&mut fx.frames, &a, frame, &b, frame).unwrap());
                prop_assert_eq!(unifier.pending(), 0);
            }
        }

        #[test]
        fn failed_unification_leaves_no_binding(a in arb_term(), b in arb_ground()) {
            let mut fx = Fixture::new(4);
            if !fx.unify(&a, &b) {
                for i in 0..4 {
                    prop_assert!(fx.value(&v(i, "V")).is_var());
                }
            }
        }
    }
}
