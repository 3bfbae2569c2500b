//! Property tests for merge precedence, validation and emission

use buildcfg::resolver::merge_layers;
use buildcfg::{
    ConfigResolver, EmitFormat, Emitter, PropertyLayer, PropertyValue, Schema, Variant,
};
use proptest::prelude::*;

const REQUIRED: [(&str, &str); 5] = [
    ("applicationId", "com.example.app"),
    ("versionCode", "1"),
    ("versionName", "1.0"),
    ("minPlatformVersion", "21"),
    ("targetPlatformVersion", "33"),
];

fn key() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["alpha", "beta", "gamma", "delta", "feature.x"])
        .prop_map(str::to_string)
}

fn layer_entries() -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::vec((key(), 0i64..1000), 0..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The merged value of a key comes from the highest-ranked layer defining it
    #[test]
    fn highest_rank_defining_layer_wins(layers in prop::collection::vec(layer_entries(), 1..6)) {
        let built: Vec<PropertyLayer> = layers
            .iter()
            .enumerate()
            .map(|(rank, entries)| {
                PropertyLayer::literal(
                    format!("layer{}", rank),
                    rank as u32,
                    entries.iter().map(|(k, v)| (k.clone(), PropertyValue::Integer(*v))),
                )
            })
            .collect();

        // shuffle input order; rank alone decides
        let merged = merge_layers(built.iter().rev());

        for layer in &built {
            for (k, _) in layer.iter() {
                let winner = built
                    .iter()
                    .filter(|l| l.get(k).is_some())
                    .max_by_key(|l| l.rank())
                    .unwrap();
                prop_assert_eq!(merged.get(k), winner.get(k));
                prop_assert_eq!(merged.winner(k), Some(winner.name()));
            }
        }
        let defined: std::collections::BTreeSet<_> =
            built.iter().flat_map(|l| l.keys()).collect();
        prop_assert_eq!(merged.len(), defined.len());
    }

    /// Dropping N required keys yields exactly N violations
    #[test]
    fn each_missing_required_key_is_one_violation(mask in prop::collection::vec(any::<bool>(), 5)) {
        let kept: Vec<(&str, &str)> = REQUIRED
            .iter()
            .zip(&mask)
            .filter(|(_, keep)| **keep)
            .map(|(entry, _)| *entry)
            .collect();
        let dropped = mask.iter().filter(|keep| !**keep).count();

        let layer = PropertyLayer::literal("app", 1, kept);
        let result = ConfigResolver::new(Schema::builtin()).resolve(vec![layer], Variant::Debug);

        if dropped == 0 {
            prop_assert!(result.is_ok());
        } else {
            let err = result.unwrap_err();
            prop_assert_eq!(err.exit_code(), 2);
            prop_assert_eq!(err.violations().len(), dropped);
            prop_assert!(err.violations().iter().all(|v| v.reason == "required"));
        }
    }

    /// Same layers in, same bytes out, whatever order the layers arrive in
    #[test]
    fn emission_is_deterministic(
        version_code in 1i64..100_000,
        flags in prop::collection::btree_map("[a-z]{1,8}", any::<bool>(), 0..5),
        reverse in any::<bool>(),
    ) {
        let base = PropertyLayer::literal("app", 1, REQUIRED);
        let over = PropertyLayer::literal(
            "override",
            2,
            std::iter::once(("versionCode".to_string(), PropertyValue::Integer(version_code)))
                .chain(flags.iter().map(|(k, v)| (format!("feature.{}", k), PropertyValue::Boolean(*v)))),
        );

        let resolver = ConfigResolver::new(Schema::builtin());
        let emitter = Emitter::new(EmitFormat::Canonical);

        let forward = resolver.resolve(vec![base.clone(), over.clone()], Variant::Debug).unwrap();
        let layers = if reverse { vec![over, base] } else { vec![base, over] };
        let again = resolver.resolve(layers, Variant::Debug).unwrap();

        prop_assert_eq!(forward.version_code(), version_code);
        prop_assert_eq!(forward.features(), &flags);
        prop_assert_eq!(emitter.emit(&forward).unwrap(), emitter.emit(&again).unwrap());
    }
}
