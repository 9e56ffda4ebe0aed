use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use holdem_engine::{
    game::{
        Action, Blinds, Deck, Game, PlayerId, PotEngine, StandardEvaluator,
        entities::{Card, HandValue, Rank, Suit},
        functional::eval,
    },
    table::Roster,
};
use std::{collections::HashMap, hint::black_box, sync::Arc};

fn roster_with(n_players: usize) -> Roster {
    let mut roster = Roster::new(n_players);
    for i in 0..n_players {
        let id = PlayerId(i as u64 + 1);
        roster
            .add(id, &format!("player{i}"), 1000, None)
            .unwrap();
    }
    roster
}

/// Benchmark hand evaluation with 7 cards (pocket + board)
fn bench_hand_eval_7_cards(c: &mut Criterion) {
    let cards = vec![
        Card(14, Suit::Spade),
        Card(13, Suit::Spade),
        Card(12, Suit::Spade),
        Card(11, Suit::Spade),
        Card(10, Suit::Spade),
        Card(2, Suit::Heart),
        Card(3, Suit::Diamond),
    ];

    c.bench_function("hand_eval_7_cards", |b| {
        b.iter(|| eval(black_box(&cards)));
    });
}

/// Benchmark evaluating every 7 card window of a shuffled deck
fn bench_hand_eval_deck(c: &mut Criterion) {
    let mut deck = Deck::seeded(42);
    let cards: Vec<Card> = std::iter::from_fn(|| deck.draw().ok()).collect();

    c.bench_function("hand_eval_46_windows", |b| {
        b.iter(|| {
            for window in cards.windows(7) {
                black_box(eval(window));
            }
        });
    });
}

/// Benchmark side pot calculation and distribution with staggered all-ins
fn bench_pot_distribution(c: &mut Criterion) {
    let mut group = c.benchmark_group("pot_distribute");

    for n_players in [2, 6, 9] {
        let mut pots = PotEngine::new();
        let mut hands = HashMap::new();
        let mut order = Vec::new();
        for i in 0..n_players {
            let player = PlayerId(i as u64 + 1);
            pots.contribute(player, 100 * (i as u32 + 1));
            hands.insert(
                player,
                HandValue {
                    rank: Rank::OnePair,
                    values: vec![(i % 5) as u8 + 2],
                },
            );
            order.push(player);
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(n_players),
            &n_players,
            |b, _| {
                b.iter(|| pots.distribute(black_box(&hands), &order));
            },
        );
    }

    group.finish();
}

/// Benchmark a full hand checked down from deal to showdown
fn bench_full_hand(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_hand");

    for n_players in [2, 6, 9] {
        group.bench_with_input(
            BenchmarkId::from_parameter(n_players),
            &n_players,
            |b, &n| {
                b.iter(|| {
                    let mut roster = roster_with(n);
                    let mut game = Game::start(
                        1,
                        &mut roster,
                        PlayerId(1),
                        Blinds { small: 5, big: 10 },
                        Deck::seeded(7),
                        Arc::new(StandardEvaluator),
                    )
                    .unwrap();
                    while let Some(player) = game.current_player() {
                        let action = if game.round().contribution(player) < game.round().highest_bet {
                            Action::Call
                        } else {
                            Action::Check
                        };
                        game.act(&mut roster, player, action).unwrap();
                    }
                    black_box(game.drain_events().count())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    hand_evaluation,
    bench_hand_eval_7_cards,
    bench_hand_eval_deck,
);

criterion_group!(game_operations, bench_pot_distribution, bench_full_hand);

criterion_main!(hand_evaluation, game_operations);
