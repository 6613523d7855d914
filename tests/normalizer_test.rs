use jobcheck::analysis::{NormalizerOptions, TextNormalizer};
use jobcheck::feature::{TermExtractor, VocabularyModel};
use regex::Regex;

const SAMPLES: [&str; 12] = [
    "<p>This is a TEST job description!!! It has HTML.</p>",
    "We&apos;re hiring: Senior Engineer &amp; Team Lead<br/>Apply now",
    "   Multiple    spaces\tand\nnewlines   ",
    "<script>var x = 1;</script><div>Visible <b>text</b></div>",
    "Earn $5,000/week from HOME -- no experience!!!",
    "",
    "the and of a an",
    "Café owner seeks barista (part-time), naïve applicants welcome",
    "「急募」【在宅ワーク】 高収入‼ job",
    "pay ‽ 〈fast〉 ＃bonus ¡now! «guaranteed»",
    "“Remote” role — apply… ⸺ today ⁂",
    "𝐀𝐏𝐏𝐋𝐘 today: ＥＡＲＮ ＄５００ from 𝕳𝕺𝕸𝕰",
];

#[test]
fn test_normalize_is_idempotent() {
    let normalizer = TextNormalizer::new();
    for sample in SAMPLES {
        let once = normalizer.normalize(sample);
        assert_eq!(normalizer.normalize(&once), once, "{sample:?}");
    }
}

#[test]
fn test_output_shape() {
    let normalizer = TextNormalizer::new();
    let punctuation = Regex::new(r"\p{P}").unwrap();
    for sample in SAMPLES {
        let cleaned = normalizer.normalize(sample);
        assert_eq!(cleaned.trim(), cleaned);
        assert!(!cleaned.contains("  "), "{cleaned:?}");
        assert!(!cleaned.contains('<') && !cleaned.contains('>'), "{cleaned:?}");
        assert!(!punctuation.is_match(&cleaned), "{cleaned:?}");
        assert!(!cleaned.chars().any(char::is_uppercase), "{cleaned:?}");
        for word in cleaned.split(' ') {
            assert!(!normalizer.stop_words().contains(word), "{word:?} in {cleaned:?}");
        }
    }
}

#[test]
fn test_markup_does_not_join_words() {
    let normalizer = TextNormalizer::new();
    assert_eq!(
        normalizer.normalize("<li>Python</li><li>Rust</li>"),
        "python rust"
    );
    assert_eq!(normalizer.normalize("<script>var x = 1;</script><div>Visible <b>text</b></div>"), "visible text");
}

#[test]
fn test_disabled_steps() {
    let normalizer = TextNormalizer::with_options(NormalizerOptions::none());
    assert_eq!(
        normalizer.normalize("  <b>The</b>   End! "),
        "<b>The</b> End!"
    );
}

#[test]
fn test_fields_merge_like_training() {
    let normalizer = TextNormalizer::new();
    let merged = normalizer.normalize_fields("Engineer", Some("<i>Rust</i>"), None);
    assert_eq!(merged, "engineer rust");
    assert_eq!(normalizer.normalize_fields("", None, None), "");
}

#[test]
fn test_cleaned_text_tokenizes_cleanly() {
    let normalizer = TextNormalizer::new();
    let extractor = TermExtractor::new((1, 1));
    for sample in SAMPLES {
        let cleaned = normalizer.normalize(sample);
        let tokens = extractor.tokens(&cleaned);
        for token in &tokens {
            assert!(cleaned.contains(token.as_str()));
        }
    }
}

#[test]
fn test_unfitted_vocabulary_refuses_transform() {
    let vocabulary = VocabularyModel::default();
    assert!(vocabulary.transform("anything").is_err());
}
