use super::*;

fn word_text(n: usize) -> String {
    (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
}

#[test]
fn empty_input_yields_no_chunks() {
    let chunks = chunk_words("", 300, 50).expect("chunking should succeed");
    assert!(chunks.is_empty());

    let chunks = chunk_words("   \n\t ", 300, 50).expect("chunking should succeed");
    assert!(chunks.is_empty());
}

#[test]
fn single_short_chunk() {
    let chunks = chunk_words("the quick brown fox", 300, 50).expect("chunking should succeed");

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].chunk_id, 0);
    assert_eq!(chunks[0].start_word, 0);
    assert_eq!(chunks[0].end_word, 4);
    assert_eq!(chunks[0].text, "the quick brown fox");
}

#[test]
fn chunk_ranges_cover_all_words_contiguously() {
    let text = word_text(1000);
    let chunk_size = 300;
    let overlap = 50;
    let chunks = chunk_words(&text, chunk_size, overlap).expect("chunking should succeed");

    // First chunk starts at word zero, last chunk ends at the word count.
    assert_eq!(chunks[0].start_word, 0);
    assert_eq!(chunks.last().expect("at least one chunk").end_word, 1000);

    // Each chunk starts exactly `overlap` words before the previous ends,
    // so the ranges cover [0, N) with no gaps.
    for pair in chunks.windows(2) {
        let stride = (chunk_size - overlap) as i32;
        assert_eq!(pair[1].start_word, pair[0].start_word + stride);
        assert!(pair[1].start_word < pair[0].end_word);
        assert_eq!(pair[0].end_word - pair[1].start_word, overlap as i32);
    }
}

#[test]
fn final_chunk_may_be_shorter() {
    let text = word_text(310);
    let chunks = chunk_words(&text, 300, 50).expect("chunking should succeed");

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].end_word - chunks[0].start_word, 300);
    assert_eq!(chunks[1].start_word, 250);
    assert_eq!(chunks[1].end_word, 310);
}

#[test]
fn chunk_text_matches_word_range() {
    let text = "a b c d e f g h i j";
    let chunks = chunk_words(text, 4, 2).expect("chunking should succeed");

    assert_eq!(chunks[0].text, "a b c d");
    assert_eq!(chunks[1].text, "c d e f");
    assert_eq!(chunks[2].text, "e f g h");
    assert_eq!(chunks[3].text, "g h i j");
    assert_eq!(chunks[4].text, "i j");
}

#[test]
fn zero_overlap_produces_disjoint_chunks() {
    let text = word_text(10);
    let chunks = chunk_words(&text, 5, 0).expect("chunking should succeed");

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].end_word, chunks[1].start_word);
}

#[test]
fn overlap_equal_to_chunk_size_is_rejected() {
    let err = chunk_words("some words here", 50, 50).expect_err("overlap == size must fail");
    assert_eq!(
        err,
        ChunkError::OverlapTooLarge {
            chunk_size: 50,
            overlap: 50
        }
    );
}

#[test]
fn overlap_greater_than_chunk_size_is_rejected() {
    let err = chunk_words("some words here", 10, 20).expect_err("overlap > size must fail");
    assert!(matches!(err, ChunkError::OverlapTooLarge { .. }));
}

#[test]
fn zero_chunk_size_is_rejected() {
    let err = chunk_words("some words here", 0, 0).expect_err("zero size must fail");
    assert_eq!(err, ChunkError::ZeroChunkSize);
}
