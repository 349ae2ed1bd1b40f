#[cfg(test)]
mod tests {
    use crate::dex::{DexError, DexFile};
    use crate::tests::fixture::{single_method_dex, FixtureBuilder, FixtureMethod};

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = single_method_dex(vec![0x000e]);
        bytes[4..7].copy_from_slice(b"099");
        let err = DexFile::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, DexError::BadMagic { .. }));

        bytes[0..4].copy_from_slice(b"dey\n");
        assert!(matches!(DexFile::from_bytes(&bytes), Err(DexError::BadMagic { .. })));
    }

    #[test]
    fn rejects_short_header() {
        let err = DexFile::from_bytes(b"dex\n035\0short").unwrap_err();
        assert!(matches!(err, DexError::Truncated { .. }));
    }

    #[test]
    fn rejects_file_size_mismatch() {
        let mut bytes = single_method_dex(vec![0x000e]);
        // Claim one byte more than the buffer actually holds
        let wrong = (bytes.len() as u32 + 1).to_le_bytes();
        bytes[32..36].copy_from_slice(&wrong);
        let err = DexFile::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, DexError::ChecksumMismatch { .. }));
    }

    #[test]
    fn rejects_bogus_endian_tag() {
        let mut bytes = single_method_dex(vec![0x000e]);
        bytes[40..44].copy_from_slice(&0xdead_beefu32.to_le_bytes());
        assert!(matches!(DexFile::from_bytes(&bytes), Err(DexError::ChecksumMismatch { .. })));
    }

    #[test]
    fn tables_round_trip_through_the_parser() {
        let bytes = single_method_dex(vec![0x000e]);
        let dex = DexFile::from_bytes(&bytes).unwrap();

        assert_eq!(dex.header.class_defs_size, 1);
        assert_eq!(dex.types[0], "LFoo;");
        assert_eq!(dex.protos[0].signature, "()V");
        assert_eq!(dex.methods[0].display(), "LFoo;.run()V");
        assert!(dex.table_faults.is_clean());

        let class_data = dex.class_defs[0].class_data.as_ref().unwrap();
        assert_eq!(class_data.direct_methods.len(), 1);
        let code = class_data.direct_methods[0].code.as_ref().unwrap();
        assert_eq!(code.registers_size, 1);
        assert_eq!(code.instructions, vec![0x000e]);
    }

    #[test]
    fn corrupted_string_decodes_with_replacement() {
        let mut b = FixtureBuilder::new();
        let foo = b.type_desc("LFoo;");
        // declared 3 UTF-16 units; 0xff is not a valid MUTF-8 lead byte
        let bad = b.raw_string(vec![0x03, b'a', 0xff, b'b', 0x00]);
        let void = b.type_desc("V");
        let shorty = b.string("V");
        let proto = b.proto(shorty, void, vec![]);
        let method = b.method(foo as u16, proto as u16, bad);
        b.class(foo, vec![FixtureMethod::with_code(method, 1, vec![0x000e])]);

        let dex = DexFile::from_bytes(&b.build()).unwrap();
        assert_eq!(dex.strings[bad as usize], "a\u{fffd}b");
        assert_eq!(dex.table_faults.string_decode, 1);
        // the method still resolves, with the replacement character inline
        assert_eq!(dex.methods[0].display(), "LFoo;.a\u{fffd}b()V");
    }

    #[test]
    fn out_of_range_table_indices_become_markers() {
        let mut b = FixtureBuilder::new();
        let foo = b.type_desc("LFoo;");
        let void = b.type_desc("V");
        let shorty = b.string("V");
        let proto = b.proto(shorty, void, vec![]);
        let name = b.string("broken");
        // type id referencing a string that does not exist
        let ghost = b.type_id(99);
        // field whose type is the broken type entry
        b.field(foo as u16, ghost as u16, name);
        // method with an out-of-range proto
        let m = b.method(foo as u16, 57, name);
        b.class(foo, vec![FixtureMethod::without_code(m)]);

        let dex = DexFile::from_bytes(&b.build()).unwrap();
        assert_eq!(dex.types[ghost as usize], "string@99");
        assert_eq!(dex.fields[0].type_desc, "string@99");
        assert_eq!(dex.methods[0].signature, "proto@57");
        assert!(dex.table_faults.index_out_of_range >= 2);
    }

    #[test]
    fn code_item_past_buffer_end_loses_only_that_method() {
        let mut b = FixtureBuilder::new();
        let foo = b.type_desc("LFoo;");
        let void = b.type_desc("V");
        let shorty = b.string("V");
        let proto = b.proto(shorty, void, vec![]);
        let good_name = b.string("good");
        let bad_name = b.string("bad");
        let good = b.method(foo as u16, proto as u16, good_name);
        let bad = b.method(foo as u16, proto as u16, bad_name);
        b.class(
            foo,
            vec![
                FixtureMethod::with_code(good, 1, vec![0x000e]),
                // code offset far past the end of the buffer
                FixtureMethod::with_bogus_code_offset(bad, 0x00ff_ff00),
            ],
        );

        let dex = DexFile::from_bytes(&b.build()).unwrap();
        let class_data = dex.class_defs[0].class_data.as_ref().unwrap();
        assert!(class_data.direct_methods[0].code.is_some());
        assert!(class_data.direct_methods[1].code.is_none());
        assert_eq!(dex.table_faults.truncated_stream, 1);
    }
}
