use proptest::prelude::*;
use veil_crypto::ope::{MAX_PLAINTEXT, MIN_PLAINTEXT};
use veil_crypto::{DeterministicCipher, KeyDeriver, OrderPreservingCipher, SearchableCipher};

fn deriver() -> KeyDeriver {
    KeyDeriver::new("property-master", "property-salt")
}

fn det() -> DeterministicCipher {
    let d = deriver();
    DeterministicCipher::new(&d.derive("v1_det:").unwrap(), &d.derive("v1_det_mac:").unwrap())
        .unwrap()
}

fn ope() -> OrderPreservingCipher {
    OrderPreservingCipher::new(&deriver().derive("v1_ope:").unwrap()).unwrap()
}

fn sse() -> SearchableCipher {
    SearchableCipher::new(&deriver().derive("v1_search:").unwrap()).unwrap()
}

fn word() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,12}"
}

proptest! {
    #[test]
    fn deterministic_is_repeatable_and_reversible(text in ".{0,64}") {
        let det = det();
        let c = det.encrypt(&text).unwrap();
        prop_assert_eq!(&c, &det.encrypt(&text).unwrap());
        prop_assert_eq!(det.decrypt(&c).unwrap(), text);
    }

    #[test]
    fn deterministic_separates_distinct_inputs(a in ".{0,32}", b in ".{0,32}") {
        prop_assume!(a != b);
        let det = det();
        prop_assert_ne!(det.encrypt(&a).unwrap(), det.encrypt(&b).unwrap());
    }

    #[test]
    fn ope_preserves_order(a in MIN_PLAINTEXT..=MAX_PLAINTEXT, b in MIN_PLAINTEXT..=MAX_PLAINTEXT) {
        let ope = ope();
        let (ca, cb) = (ope.encrypt(a).unwrap(), ope.encrypt(b).unwrap());
        prop_assert_eq!(a.cmp(&b), ca.cmp(&cb));
    }

    #[test]
    fn ope_round_trips(x in MIN_PLAINTEXT..=MAX_PLAINTEXT) {
        let ope = ope();
        prop_assert_eq!(ope.decrypt(ope.encrypt(x).unwrap()).unwrap(), x);
    }

    #[test]
    fn searchable_round_trips(words in proptest::collection::vec(word(), 1..6)) {
        let sse = sse();
        let text = words.join(" ");
        prop_assert_eq!(sse.decrypt(&sse.encrypt(&text).unwrap()).unwrap(), text);
    }

    #[test]
    fn searchable_finds_present_words(words in proptest::collection::vec(word(), 1..6), pick in any::<prop::sample::Index>()) {
        let sse = sse();
        let enc = sse.encrypt(&words.join(" ")).unwrap();
        let needle = pick.get(&words);
        prop_assert!(sse.search(&sse.word_digest(needle), &enc));
        prop_assert!(sse.search_all(&sse.encrypt(needle).unwrap(), &enc));
    }

    #[test]
    fn searchable_misses_absent_words(words in proptest::collection::vec(word(), 1..6), absent in "[A-Z]{3,8}") {
        let sse = sse();
        let enc = sse.encrypt(&words.join(" ")).unwrap();
        prop_assert!(!sse.search(&sse.word_digest(&absent), &enc));
        prop_assert!(!sse.search_all(&sse.encrypt(&absent).unwrap(), &enc));
    }
}
