
#[cfg(test)]
mod tests {
    use crate::android::emitter::XML_DECLARATION;
    use crate::tests::builder::AxmlBuilder;
    use crate::{decode_bytes, Decoder, Document};

    fn assert_send<T: Send>() {}

    #[test]
    fn decoder_state_is_sendable() {
        assert_send::<Decoder>();
        assert_send::<Document>();
    }

    #[test]
    fn declaration_line_is_always_first() {
        let mut empty = AxmlBuilder::new();
        empty.intern("unused");
        let mut single = AxmlBuilder::new();
        single.start("manifest", &[]);
        single.end("manifest");

        for bytes in [empty.build(), single.build()] {
            let doc = decode_bytes(&bytes).unwrap();
            assert!(doc.xml().starts_with(XML_DECLARATION));
        }
    }
}
