use proptest::prelude::*;
use std::sync::{Arc, LazyLock};
use veil_core::{KeyRing, ValueCodec, WireForm};
use veil_crypto::PaillierKey;

static KEYS: LazyLock<Arc<KeyRing>> = LazyLock::new(|| {
    KeyRing::builder()
        .paillier(PaillierKey::generate(512).expect("key generation"))
        .secret("codec master", "codec salt")
        .build()
        .expect("key ring")
});

fn codec(form: WireForm) -> ValueCodec {
    ValueCodec::new(Arc::clone(&KEYS), form, form == WireForm::Tagged).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_text_round_trips(text in "[a-zA-Z ,.:!?-]{0,64}") {
        for form in [WireForm::Tagged, WireForm::Untagged] {
            let codec = codec(form);
            prop_assert_eq!(codec.decode(&codec.encode(&text).unwrap()).unwrap(), text.clone());
        }
    }

    #[test]
    fn test_integers_round_trip_as_add(n in any::<i64>()) {
        let codec = codec(WireForm::Tagged);
        let wire = codec.encode(&n.to_string()).unwrap();
        prop_assert!(wire.starts_with("ADD|"));
        prop_assert_eq!(codec.decode(&wire).unwrap(), n.to_string());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_number_like_text_round_trips_exactly(text in "[+-]?[0-9_]{1,40}") {
        let codec = codec(WireForm::Tagged);
        prop_assert_eq!(codec.decode(&codec.encode(&text).unwrap()).unwrap(), text);
    }
}

#[test]
fn test_non_canonical_integers_stay_opaque() {
    let codec = codec(WireForm::Tagged);
    for text in ["1_000", "+5", "007", "-0", "- 3", "0x10"] {
        let wire = codec.encode(text).unwrap();
        assert!(wire.starts_with("RND|"), "{text} was stored as {wire}");
        assert_eq!(codec.decode(&wire).unwrap(), text);
    }
}

#[test]
fn test_integers_beyond_the_paillier_domain_stay_opaque() {
    let codec = codec(WireForm::Tagged);
    let huge = "9".repeat(700);
    let negative = format!("-{huge}");
    for text in [huge.as_str(), negative.as_str()] {
        let wire = codec.encode(text).unwrap();
        assert!(wire.starts_with("RND|"));
        assert_eq!(codec.decode(&wire).unwrap(), text);
    }
}
