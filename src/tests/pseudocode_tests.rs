#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;

    use crate::dex::DexFile;
    use crate::tests::fixture::{single_method_dex, FixtureBuilder, FixtureMethod};
    use crate::{decompile, decompile_filtered};

    #[test]
    fn canonical_block_is_exact_and_deterministic() {
        // const/4 v0, #1 | if-eqz v0, +2 | return-void
        let bytes = single_method_dex(vec![0x1012, 0x0038, 0x0002, 0x000e]);
        let dex = DexFile::from_bytes(&bytes).unwrap();

        let first = dex.to_pseudocode(None);
        assert_eq!(first.classes.len(), 1);
        assert_eq!(
            first.classes[0].text(),
            "Class: LFoo;\n{\n  v0 = 1;\n  if (v0 == 0) goto label_6;\n  return;\n}\n"
        );
        assert!(first.faults.is_clean());

        let second = dex.to_pseudocode(None);
        assert_eq!(first, second);
    }

    #[test]
    fn statement_families_render() {
        let mut b = FixtureBuilder::new();
        let foo = b.type_desc("LFoo;");
        let void = b.type_desc("V");
        let string_t = b.type_desc("Ljava/lang/String;");
        let int_t = b.type_desc("I");
        let bar = b.type_desc("LBar;");

        let shorty_v = b.string("V");
        let shorty_vl = b.string("VL");
        let run_proto = b.proto(shorty_v, void, vec![]);
        let greet_proto = b.proto(shorty_vl, void, vec![string_t as u16]);

        let count_n = b.string("count");
        let total_n = b.string("total");
        let count_f = b.field(foo as u16, int_t as u16, count_n);
        let total_f = b.field(foo as u16, int_t as u16, total_n);

        let run_n = b.string("run");
        let greet_n = b.string("greet");
        let run_m = b.method(foo as u16, run_proto as u16, run_n);
        let greet_m = b.method(bar as u16, greet_proto as u16, greet_n);

        let hi = b.string("hi");

        let insns: Vec<u16> = vec![
            0x011a, hi as u16, // const-string v1, "hi"
            0x206e, greet_m as u16, 0x0010, // invoke-virtual {v0, v1}, greet
            0x2052, count_f as u16, // iget v0, v2, count
            0x0067, total_f as u16, // sput v0, total
            0x00d8, 0x0300, // add-int/lit8 v0, v0, #3
            0x000e, // return-void
        ];
        b.class(foo, vec![FixtureMethod::with_code(run_m, 3, insns)]);

        let dex = DexFile::from_bytes(&b.build()).unwrap();
        let out = dex.to_pseudocode(None);
        let method = &out.classes[0].methods[0];

        assert_eq!(method.name, "LFoo;.run()V");
        let texts: Vec<&str> = method.statements.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "v1 = \"hi\";",
                "v0.greet(v1);",
                "v0 = v2.count;",
                "LFoo;.total = v0;  // static",
                "v0 = v0 + 3;",
                "return;",
            ]
        );
        assert!(method.faults.is_clean());
    }

    #[test]
    fn goto_labels_use_absolute_byte_offsets() {
        let bytes = single_method_dex(vec![0x000e, 0xff28]);
        let out = decompile(&bytes).unwrap();
        let texts: Vec<&str> =
            out.classes[0].methods[0].statements.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["return;", "goto label_0;"]);
    }

    #[test]
    fn unknown_opcode_renders_placeholder_and_continues() {
        let bytes = single_method_dex(vec![0x003e, 0x000e]);
        let out = decompile(&bytes).unwrap();
        let method = &out.classes[0].methods[0];

        assert_eq!(method.statements[0].text, "// unknown opcode 0x3e at 0x0");
        assert_eq!(method.statements[1].text, "return;");
        assert_eq!(method.faults.unsupported_opcode, 1);
        assert_eq!(out.faults.unsupported_opcode, 1);
    }

    #[test]
    fn out_of_range_string_reference_renders_marker() {
        let bytes = single_method_dex(vec![0x011a, 0x0063, 0x000e]);
        let out = decompile(&bytes).unwrap();
        let method = &out.classes[0].methods[0];

        assert_eq!(method.statements[0].text, "v1 = string@99;");
        assert_eq!(method.faults.index_out_of_range, 1);
    }

    #[test]
    fn switch_dispatch_and_table_stay_opaque() {
        let insns: Vec<u16> = vec![
            0x002b, 0x0004, 0x0000, // packed-switch v0, table at +4
            0x000e, // return-void
            0x0100, 0x0001, 0x0000, 0x0000, 0x0002, 0x0000, // payload, one target
        ];
        let out = decompile(&single_method_dex(insns)).unwrap();
        let texts: Vec<&str> =
            out.classes[0].methods[0].statements.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "// packed-switch v0, table at 0x8",
                "return;",
                "// packed-switch table (6 code units) at 0x8",
            ]
        );
        assert!(out.faults.is_clean());
    }

    #[test]
    fn truncated_method_keeps_partial_statements_and_siblings() {
        let mut b = FixtureBuilder::new();
        let foo = b.type_desc("LFoo;");
        let void = b.type_desc("V");
        let shorty = b.string("V");
        let proto = b.proto(shorty, void, vec![]);
        let bad_n = b.string("bad");
        let good_n = b.string("good");
        let bad_m = b.method(foo as u16, proto as u16, bad_n);
        let good_m = b.method(foo as u16, proto as u16, good_n);
        b.class(
            foo,
            vec![
                // const/4 decodes, then const/16 is cut off mid-instruction
                FixtureMethod::with_code(bad_m, 1, vec![0x1012, 0x0013]),
                FixtureMethod::with_code(good_m, 1, vec![0x000e]),
            ],
        );

        let out = decompile(&b.build()).unwrap();
        let bad = &out.classes[0].methods[0];
        let good = &out.classes[0].methods[1];

        assert_eq!(bad.statements[0].text, "v0 = 1;");
        assert_eq!(bad.statements[1].text, "// instruction stream truncated");
        assert_eq!(bad.faults.truncated_stream, 1);

        assert_eq!(good.statements[0].text, "return;");
        assert!(good.faults.is_clean());
        assert_eq!(out.faults.truncated_stream, 1);
    }

    #[test]
    fn filter_limits_synthesized_classes() {
        let mut b = FixtureBuilder::new();
        let foo = b.type_desc("LFoo;");
        let bar = b.type_desc("LBar;");
        let void = b.type_desc("V");
        let shorty = b.string("V");
        let proto = b.proto(shorty, void, vec![]);
        let run_n = b.string("run");
        let foo_m = b.method(foo as u16, proto as u16, run_n);
        let bar_m = b.method(bar as u16, proto as u16, run_n);
        b.class(foo, vec![FixtureMethod::with_code(foo_m, 1, vec![0x000e])]);
        b.class(bar, vec![FixtureMethod::with_code(bar_m, 1, vec![0x000e])]);
        let bytes = b.build();

        let all = decompile(&bytes).unwrap();
        assert_eq!(all.classes.len(), 2);

        let filter: HashSet<String> = ["LBar;".to_string()].into();
        let only_bar = decompile_filtered(&bytes, &filter).unwrap();
        assert_eq!(only_bar.classes.len(), 1);
        assert_eq!(only_bar.classes[0].name, "LBar;");
    }

    #[test]
    fn independent_classes_decode_identically_in_parallel() {
        let mut b = FixtureBuilder::new();
        let foo = b.type_desc("LFoo;");
        let bar = b.type_desc("LBar;");
        let void = b.type_desc("V");
        let shorty = b.string("V");
        let proto = b.proto(shorty, void, vec![]);
        let run_n = b.string("run");
        let foo_m = b.method(foo as u16, proto as u16, run_n);
        let bar_m = b.method(bar as u16, proto as u16, run_n);
        b.class(foo, vec![FixtureMethod::with_code(foo_m, 1, vec![0x1012, 0x000e])]);
        b.class(bar, vec![FixtureMethod::with_code(bar_m, 1, vec![0x000e])]);

        let dex = DexFile::from_bytes(&b.build()).unwrap();
        let sequential = dex.to_pseudocode(None);

        let foo_filter: HashSet<String> = ["LFoo;".to_string()].into();
        let bar_filter: HashSet<String> = ["LBar;".to_string()].into();
        let (foo_out, bar_out) = thread::scope(|scope| {
            let f = scope.spawn(|| dex.to_pseudocode(Some(&foo_filter)));
            let g = scope.spawn(|| dex.to_pseudocode(Some(&bar_filter)));
            (f.join().unwrap(), g.join().unwrap())
        });

        assert_eq!(foo_out.classes[0], sequential.classes[0]);
        assert_eq!(bar_out.classes[0], sequential.classes[1]);
    }
}
