//! Benchmark and demo programs, built as terms.

use hornet::{func, list, var, Term};

/// `member/2`.
pub fn member() -> Vec<Term> {
    vec![
        func!("member"; var!("X"), list![var!("X"); var!("_")]),
        func!(":-";
            func!("member"; var!("X"), list![var!("_"); var!("T")]),
            func!("member"; var!("X"), var!("T"))),
    ]
}

/// N-queens by generate and test, one row at a time.
///
/// ```text
/// queens(N, Qs) :- place(N, N, [], Qs).
/// place(0, _, Qs, Qs) :- !.
/// place(K, N, Acc, Qs) :-
///     between(1, N, Q), safe(Q, Acc, 1),
///     K1 is K - 1, place(K1, N, [Q|Acc], Qs).
/// safe(_, [], _).
/// safe(Q, [Q1|Qs], D) :-
///     Q =\= Q1, abs(Q - Q1) =\= D, D1 is D + 1, safe(Q, Qs, D1).
/// ```
pub fn queens() -> Vec<Term> {
    let (k, n, q, qs, acc, d) = (var!("K"), var!("N"), var!("Q"), var!("Qs"), var!("Acc"), var!("D"));
    vec![
        func!(":-"; func!("queens"; n.clone(), qs.clone()), func!("place"; n.clone(), n.clone(), Term::nil(), qs.clone())),
        func!(":-"; func!("place"; 0, var!("_"), qs.clone(), qs.clone()), "!"),
        func!(":-";
            func!("place"; k.clone(), n.clone(), acc.clone(), qs.clone()),
            func!(",";
                func!("between"; 1, n.clone(), q.clone()),
                func!(",";
                    func!("safe"; q.clone(), acc.clone(), 1),
                    func!(",";
                        func!("is"; var!("K1"), func!("-"; k, 1)),
                        func!("place"; var!("K1"), n, list![q.clone(); acc], qs.clone()))))),
        func!("safe"; var!("_"), Term::nil(), var!("_")),
        func!(":-";
            func!("safe"; q.clone(), list![var!("Q1"); qs.clone()], d.clone()),
            func!(",";
                func!("=\\="; q.clone(), var!("Q1")),
                func!(",";
                    func!("=\\="; func!("abs"; func!("-"; q.clone(), var!("Q1"))), d.clone()),
                    func!(",";
                        func!("is"; var!("D1"), func!("+"; d, 1)),
                        func!("safe"; q, qs, var!("D1")))))),
    ]
}

/// Naive reverse over a list of integers.
///
/// ```text
/// app([], L, L).
/// app([H|T], L, [H|R]) :- app(T, L, R).
/// nrev([], []).
/// nrev([H|T], R) :- nrev(T, RT), app(RT, [H], R).
/// range(N, N, [N]) :- !.
/// range(I, N, [I|T]) :- I < N, I1 is I + 1, range(I1, N, T).
/// bench(0, _) :- !.
/// bench(K, L) :- nrev(L, _), K1 is K - 1, bench(K1, L).
/// ```
pub fn nrev() -> Vec<Term> {
    let (h, t, l, r) = (var!("H"), var!("T"), var!("L"), var!("R"));
    vec![
        func!("app"; Term::nil(), l.clone(), l.clone()),
        func!(":-";
            func!("app"; list![h.clone(); t.clone()], l.clone(), list![h.clone(); r.clone()]),
            func!("app"; t.clone(), l.clone(), r.clone())),
        func!("nrev"; Term::nil(), Term::nil()),
        func!(":-";
            func!("nrev"; list![h.clone(); t.clone()], r.clone()),
            func!(",";
                func!("nrev"; t.clone(), var!("RT")),
                func!("app"; var!("RT"), list![h], r))),
        func!(":-"; func!("range"; var!("N"), var!("N"), list![var!("N")]), "!"),
        func!(":-";
            func!("range"; var!("I"), var!("N"), list![var!("I"); t.clone()]),
            func!(",";
                func!("<"; var!("I"), var!("N")),
                func!(",";
                    func!("is"; var!("I1"), func!("+"; var!("I"), 1)),
                    func!("range"; var!("I1"), var!("N"), t)))),
        func!(":-"; func!("bench"; 0, var!("_")), "!"),
        func!(":-";
            func!("bench"; var!("K"), l.clone()),
            func!(",";
                func!("nrev"; l.clone(), var!("_")),
                func!(",";
                    func!("is"; var!("K1"), func!("-"; var!("K"), 1)),
                    func!("bench"; var!("K1"), l)))),
    ]
}

/// A counting loop whose recursive call is the last goal.
///
/// ```text
/// count(I, N) :- I < N, !, gauge, I1 is I + 1, count(I1, N).
/// count(N, N).
/// ```
pub fn count() -> Vec<Term> {
    vec![
        func!(":-";
            func!("count"; var!("I"), var!("N")),
            func!(",";
                func!("<"; var!("I"), var!("N")),
                func!(",";
                    "!",
                    func!(",";
                        "gauge",
                        func!(",";
                            func!("is"; var!("I1"), func!("+"; var!("I"), 1)),
                            func!("count"; var!("I1"), var!("N"))))))),
        func!("count"; var!("N"), var!("N")),
    ]
}
