#![allow(dead_code)]

pub mod searchlab_env;

use searchlab::session::{ResultBatch, SearchResult};

/// Query results with a mix of official and unrelated pages.
pub fn apple_batch() -> ResultBatch {
    ResultBatch::from_results(
        "apple",
        [
            SearchResult::new("https://www.apple.com", "Apple Inc.", "Official site of Apple"),
            SearchResult::new("https://pie.example/recipe", "Apple Pie Recipe", "Bake a classic pie"),
            SearchResult::new("https://www.apple.com/retail", "Apple Store", "Find an Apple Store"),
        ],
    )
}

pub fn movie_batch(query: &str) -> ResultBatch {
    ResultBatch::from_results(
        query,
        [
            SearchResult::new("https://www.imdb.com/title/tt0113277", "Heat (1995) - IMDb", "Directed by Michael Mann"),
            SearchResult::new("https://en.wikipedia.org/wiki/Heat", "Heat - Wikipedia", "Heat is energy in transfer"),
            SearchResult::new("/url?q=related", "Related searches", ""),
            SearchResult::new("https://weather.example/heatwave", "Heatwave warning", "Stay cool this summer"),
        ],
    )
}
