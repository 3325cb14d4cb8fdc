#![allow(dead_code)]

use petri_reach::net::{NetBuilder, NetModel};

pub fn ring(n: usize) -> NetModel {
    let mut builder = NetBuilder::new();
    let places: Vec<_> = (0..n).map(|i| builder.place(format!("p{}", i + 1), i == 0)).collect();
    for i in 0..n {
        builder.transition(format!("t{}", i + 1), [places[i]], [places[(i + 1) % n]]);
    }
    builder.build().unwrap()
}

pub fn mutex() -> NetModel {
    let mut builder = NetBuilder::new();
    let lock = builder.place("lock", true);
    for i in 1..=2 {
        let idle = builder.place(format!("idle{}", i), true);
        let critical = builder.place(format!("critical{}", i), false);
        builder.transition(format!("enter{}", i), [idle, lock], [critical]);
        builder.transition(format!("leave{}", i), [critical], [idle, lock]);
    }
    builder.build().unwrap()
}

/// Each philosopher takes the left fork, then the right one.
pub fn philosophers(n: usize) -> NetModel {
    let mut builder = NetBuilder::new();
    let forks: Vec<_> = (0..n).map(|i| builder.place(format!("fork{}", i), true)).collect();
    for i in 0..n {
        let left = forks[i];
        let right = forks[(i + 1) % n];
        let thinking = builder.place(format!("thinking{}", i), true);
        let waiting = builder.place(format!("waiting{}", i), false);
        let eating = builder.place(format!("eating{}", i), false);
        builder.transition(format!("take_left{}", i), [thinking, left], [waiting]);
        builder.transition(format!("take_right{}", i), [waiting, right], [eating]);
        builder.transition(format!("release{}", i), [eating], [thinking, left, right]);
    }
    builder.build().unwrap()
}

/// Producer and consumer around a one-slot buffer.
pub fn buffer() -> NetModel {
    let mut builder = NetBuilder::new();
    let ready = builder.place("ready", true);
    let produced = builder.place("produced", false);
    let empty = builder.place("empty", true);
    let full = builder.place("full", false);
    let waiting = builder.place("waiting", true);
    let consumed = builder.place("consumed", false);
    builder.transition("produce", [ready], [produced]);
    builder.transition("put", [produced, empty], [ready, full]);
    builder.transition("get", [waiting, full], [consumed, empty]);
    builder.transition("consume", [consumed], [waiting]);
    builder.build().unwrap()
}

/// Two tokens each ending in its own sink.
pub fn two_chains() -> NetModel {
    let mut builder = NetBuilder::new();
    let a0 = builder.place("a0", true);
    let a1 = builder.place("a1", false);
    let b0 = builder.place("b0", true);
    let b1 = builder.place("b1", false);
    let b2 = builder.place("b2", false);
    builder.transition("a", [a0], [a1]);
    builder.transition("b", [b0], [b1]);
    builder.transition("c", [b1], [b2]);
    builder.build().unwrap()
}

pub fn place_ids(net: &NetModel) -> Vec<&str> {
    net.places().iter().map(|p| p.id.as_str()).collect()
}
