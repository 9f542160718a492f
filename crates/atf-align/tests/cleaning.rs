use std::io::Write;
use std::sync::Arc;

use atf_align::{
    BatchConfig, BatchRunner, CleaningFilter, FilterConfig, KeptWriter, PairReader,
    SimilarityClassifier, similarity,
};
use atf_codec::WordCodec;
use atf_mapping::MappingTable;
use atf_types::{Label, Thresholds, WordPair};
use proptest::prelude::*;

fn codec() -> WordCodec {
    WordCodec::new(Arc::new(MappingTable::builtin().expect("builtin table")))
}

#[test]
fn cleans_a_corpus_file_end_to_end() {
    let mut input = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("tempfile");
    write!(
        input,
        "internal_id,id_text,id_word,tr_oracc,tr_cdli\n\
         1,P100,P100.1,lu₂-{{d}}nin-šubur,lu2-{{d}}nin-szubur\n\
         2,P100,P100.2,ma-n,ma-na\n\
         3,P100,P100.3,\"dumu]-er-s,e-tim\",dumu\n\
         4,P100,P100.4,($,x\n\
         5,P100,P100.5,,gu4\n\
         6,P100,P100.6,{{d}}utu,{{d-utu\n\
         7,P100,P100.7,\"ṣa,ṣa\",\"s,a,s,a\"\n"
    )
    .unwrap();
    input.flush().unwrap();

    let filter = CleaningFilter::new(codec(), FilterConfig::default());
    let reader = PairReader::open(input.path()).expect("open corpus");
    let mut writer = KeptWriter::new(Vec::new()).unwrap();
    let summary = BatchRunner::new(&filter, BatchConfig::default())
        .run(reader, |kept| writer.write(&kept))
        .expect("run");

    assert_eq!(summary.empty_column, 1);
    assert_eq!(summary.counts.total, 6);
    assert_eq!(summary.counts.kept, 3);
    assert_eq!(summary.counts.garbage, 1);
    assert_eq!(summary.counts.malformed, 1);
    assert_eq!(summary.counts.label(Label::LikelyMisaligned), 1);

    let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("P100,P100.1,"));
    assert!(lines[1].ends_with(",exact,1.000000,1.000000"));
    assert!(lines[2].contains(",conversion_issue,0.800000,0.800000"));
    assert!(lines[3].starts_with("P100,P100.7,\"s,a,s,a\",\"ṣa,ṣa\",exact"));
}

#[test]
fn in_memory_corpus_drops_misaligned_rows() {
    let csv = "id_text,id_word,tr_cdli,tr_oracc\nP1,1,dumu,\"dumu]-er-s,e-tim\"\n";
    let filter = CleaningFilter::new(codec(), FilterConfig::default());
    let reader = PairReader::new(csv.as_bytes(), b',').unwrap();
    let summary = BatchRunner::new(&filter, BatchConfig::default())
        .run(reader, |_| Ok(()))
        .unwrap();
    assert_eq!(summary.counts.label(Label::LikelyMisaligned), 1);
    assert_eq!(summary.counts.kept, 0);
}

fn short_word() -> impl Strategy<Value = String> {
    "[a-z]{1,3}(-[a-z]{1,3}){0,3}"
}

proptest! {
    #[test]
    fn similarity_is_one_on_identity(word in "\\PC{0,12}") {
        prop_assert_eq!(similarity(&word, &word), 1.0);
    }

    #[test]
    fn raising_the_floor_only_drops_more(
        pairs in prop::collection::vec((short_word(), short_word()), 1..40),
        low in 0.05f64..0.5,
        bump in 0.01f64..0.4,
    ) {
        let high = 0.95;
        let t1 = Thresholds::new(high, low).unwrap();
        let raised = (low + bump).min(0.9);
        let t2 = Thresholds::new(high, raised).unwrap();
        let classifier = SimilarityClassifier::new(codec());
        for (i, (cdli, oracc)) in pairs.iter().enumerate() {
            let pair = WordPair::new("P", i.to_string(), cdli.as_str(), oracc.as_str());
            let under_t1 = classifier.classify(&pair, &t1).unwrap().label;
            let under_t2 = classifier.classify(&pair, &t2).unwrap().label;
            if under_t1 == Label::LikelyMisaligned {
                prop_assert_eq!(under_t2, Label::LikelyMisaligned);
            }
        }
    }
}
