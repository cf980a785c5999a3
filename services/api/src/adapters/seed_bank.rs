//! services/api/src/adapters/seed_bank.rs
//!
//! The built-in question catalog served by the API. Order matters: challenge
//! question sets are prefixes of each tier's list, so entries must only ever be
//! appended.

use trivia_core::domain::{DifficultyTier, Question};
use trivia_core::question_bank::{CatalogError, QuestionBank};

fn q(
    id: &str,
    tier: DifficultyTier,
    time_limit_seconds: u32,
    text: &str,
    options: [&str; 4],
    correct_option_index: usize,
) -> Question {
    Question {
        id: id.to_string(),
        text: text.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_option_index,
        tier,
        time_limit_seconds,
    }
}

pub fn seed_questions() -> Vec<Question> {
    use DifficultyTier::*;
    vec![
        // Easy
        q(
            "e-01",
            Easy,
            15,
            "What is the capital of France?",
            ["Paris", "Lyon", "Marseille", "Nice"],
            0,
        ),
        q("e-02", Easy, 15, "How many legs does a spider have?", ["6", "8", "10", "12"], 1),
        q(
            "e-03",
            Easy,
            15,
            "Which planet is known as the Red Planet?",
            ["Venus", "Jupiter", "Mars", "Mercury"],
            2,
        ),
        q(
            "e-04",
            Easy,
            15,
            "At sea level, water boils at how many degrees Celsius?",
            ["90", "100", "110", "120"],
            1,
        ),
        q(
            "e-05",
            Easy,
            15,
            "Which is the largest ocean on Earth?",
            ["Atlantic", "Indian", "Arctic", "Pacific"],
            3,
        ),
        q("e-06", Easy, 15, "How many days are in a leap year?", ["364", "365", "366", "367"], 2),
        // Medium
        q(
            "m-01",
            Medium,
            15,
            "Who wrote 'Pride and Prejudice'?",
            ["Charlotte Brontë", "Jane Austen", "Mary Shelley", "George Eliot"],
            1,
        ),
        q("m-02", Medium, 15, "What is the chemical symbol for gold?", ["Au", "Ag", "Gd", "Go"], 0),
        q(
            "m-03",
            Medium,
            15,
            "In which year did the Berlin Wall fall?",
            ["1987", "1989", "1991", "1993"],
            1,
        ),
        q("m-04", Medium, 15, "What is the smallest prime number?", ["0", "1", "2", "3"], 2),
        q(
            "m-05",
            Medium,
            15,
            "Which gas makes up most of Earth's atmosphere?",
            ["Oxygen", "Carbon dioxide", "Argon", "Nitrogen"],
            3,
        ),
        q(
            "m-06",
            Medium,
            15,
            "What is the longest river in South America?",
            ["Amazon", "Paraná", "Orinoco", "Magdalena"],
            0,
        ),
        // Hard
        q(
            "h-01",
            Hard,
            20,
            "Which element has the atomic number 26?",
            ["Iron", "Cobalt", "Nickel", "Copper"],
            0,
        ),
        q(
            "h-02",
            Hard,
            20,
            "Who painted 'The Garden of Earthly Delights'?",
            ["Pieter Bruegel", "Hieronymus Bosch", "Jan van Eyck", "Albrecht Dürer"],
            1,
        ),
        q(
            "h-03",
            Hard,
            20,
            "What is the capital of Kazakhstan?",
            ["Almaty", "Tashkent", "Astana", "Bishkek"],
            2,
        ),
        q(
            "h-04",
            Hard,
            20,
            "How many bones are in the adult human body?",
            ["186", "206", "226", "246"],
            1,
        ),
        q(
            "h-05",
            Hard,
            20,
            "Which treaty ended the Thirty Years' War?",
            [
                "Treaty of Utrecht",
                "Treaty of Versailles",
                "Peace of Westphalia",
                "Treaty of Tordesillas",
            ],
            2,
        ),
        q(
            "h-06",
            Hard,
            20,
            "Roughly how fast does light travel in a vacuum?",
            ["150,000 km/s", "300,000 km/s", "450,000 km/s", "600,000 km/s"],
            1,
        ),
        q(
            "h-07",
            Hard,
            20,
            "Who composed 'The Rite of Spring'?",
            ["Igor Stravinsky", "Sergei Prokofiev", "Claude Debussy", "Maurice Ravel"],
            0,
        ),
        q(
            "h-08",
            Hard,
            20,
            "Which mineral ranks 9 on the Mohs hardness scale?",
            ["Topaz", "Quartz", "Corundum", "Beryl"],
            2,
        ),
        q(
            "h-09",
            Hard,
            20,
            "Which programming language is known for its borrow checker?",
            ["Go", "Rust", "Swift", "Kotlin"],
            1,
        ),
        q(
            "h-10",
            Hard,
            20,
            "What is the largest moon of Saturn?",
            ["Rhea", "Titan", "Enceladus", "Iapetus"],
            1,
        ),
        // Very hard
        q(
            "v-01",
            VeryHard,
            25,
            "Who proved the incompleteness theorems?",
            ["David Hilbert", "Kurt Gödel", "Alan Turing", "Emmy Noether"],
            1,
        ),
        q(
            "v-02",
            VeryHard,
            25,
            "Which letter appears in no US state name?",
            ["J", "Q", "X", "Z"],
            1,
        ),
        q(
            "v-03",
            VeryHard,
            25,
            "Which city was the capital of the Byzantine Empire?",
            ["Rome", "Antioch", "Constantinople", "Alexandria"],
            2,
        ),
        q(
            "v-04",
            VeryHard,
            25,
            "What is the approximate half-life of carbon-14?",
            ["573 years", "5,730 years", "57,300 years", "573,000 years"],
            1,
        ),
        q(
            "v-05",
            VeryHard,
            25,
            "Which organelle is the site of protein synthesis?",
            ["Mitochondrion", "Golgi apparatus", "Ribosome", "Lysosome"],
            2,
        ),
        q(
            "v-06",
            VeryHard,
            25,
            "Who was the first woman to win a Nobel Prize?",
            ["Marie Curie", "Bertha von Suttner", "Dorothy Hodgkin", "Lise Meitner"],
            0,
        ),
        // Impossible
        q(
            "i-01",
            Impossible,
            30,
            "What is the order of magnitude of the Planck constant in J·s?",
            ["10^-24", "10^-34", "10^-44", "10^-14"],
            1,
        ),
        q(
            "i-02",
            Impossible,
            30,
            "In which year was Magna Carta first sealed?",
            ["1066", "1215", "1314", "1415"],
            1,
        ),
        q(
            "i-03",
            Impossible,
            30,
            "What is the deepest known point of the Mariana Trench called?",
            ["Tonga Deep", "Challenger Deep", "Sirena Deep", "Horizon Deep"],
            1,
        ),
        q(
            "i-04",
            Impossible,
            30,
            "Which element is named after the Swedish village of Ytterby?",
            ["Yttrium", "Europium", "Francium", "Polonium"],
            0,
        ),
        q(
            "i-05",
            Impossible,
            30,
            "What is the smallest perfect number?",
            ["1", "6", "12", "28"],
            1,
        ),
    ]
}

/// The catalog every connected client plays from.
pub fn seed_bank() -> Result<QuestionBank, CatalogError> {
    QuestionBank::new(seed_questions())
}
