//! Sample roster for demo and rehearsal tournaments
//!
//! Player `x` signs in as `x@x.com` with password `x`.

pub struct SeedPlayer {
    pub letter: char,
    pub name: &'static str,
    pub is_power_player: bool,
}

impl SeedPlayer {
    pub fn email(&self) -> String {
        format!("{0}@{0}.com", self.letter)
    }

    pub fn password(&self) -> String {
        self.letter.to_string()
    }
}

pub const SEED_PHONE: &str = "1231231234";

const fn seed(letter: char, name: &'static str, is_power_player: bool) -> SeedPlayer {
    SeedPlayer {
        letter,
        name,
        is_power_player,
    }
}

pub static SEED_ROSTER: [SeedPlayer; 24] = [
    seed('a', "Alice Anderson", false),
    seed('b', "Bob Baker", false),
    seed('c', "Carol Carter", false),
    seed('d', "David Davis", false),
    seed('e', "Emma Edwards", true),
    seed('f', "Frank Foster", false),
    seed('g', "Grace Garcia", false),
    seed('h', "Henry Harris", false),
    seed('i', "Iris Ingram", false),
    seed('j', "Jack Johnson", true),
    seed('k', "Karen King", false),
    seed('l', "Leo Lewis", false),
    seed('m', "Maria Martinez", false),
    seed('n', "Noah Nelson", false),
    seed('o', "Olivia Owens", true),
    seed('p', "Paul Parker", false),
    seed('q', "Quinn Quigley", false),
    seed('r', "Rachel Roberts", false),
    seed('s', "Sam Smith", false),
    seed('t', "Tina Taylor", true),
    seed('u', "Uma Underwood", false),
    seed('v', "Victor Valdez", false),
    seed('w', "Wendy Wilson", false),
    seed('x', "Xavier Xu", false),
];
