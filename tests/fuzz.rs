use superdst::{DecodeError, SizeCodecBuf, SuperDst, SuperDstTriggerSeries};

#[test]
fn huge_stamp_count_is_rejected() {
    let mut data = vec![1u8, 0xf7];
    data.extend_from_slice(&[0xff; 8]);
    assert!(SuperDst::from_bytes(&data).is_err());
}

#[test]
fn width_runs_longer_than_stamps() {
    let data = [1u8, 0, 0, 1, 0xf1, 0, 0, 0, 0];
    assert!(matches!(
        SuperDst::from_bytes(&data),
        Err(DecodeError::MalformedData(_))
    ));
}

#[test]
fn unused_extra_bytes() {
    let data = [1u8, 0, 0, 0, 0, 0, 0, 1, 0x05];
    assert!(matches!(
        SuperDst::from_bytes(&data),
        Err(DecodeError::MalformedData(_))
    ));
}

#[test]
fn truncated_overflow_chain() {
    // v0 stamp with a saturated header time, then a single full overflow word.
    let data = [0u8, 2, 0xff, 0x80, 0xff, 0xff, 1, 0x00, 0xe0];
    assert!(matches!(
        SuperDst::from_bytes(&data),
        Err(DecodeError::MalformedData(_))
    ));
}

#[test]
fn size_tag_without_payload() {
    let data = [0xf7u8, 1, 2];
    let mut buf = data.as_slice();
    assert_eq!(buf.get_size(), Err(DecodeError::UnexpectedEob));
    assert!(buf.is_empty());
}

#[test]
fn trigger_count_without_records() {
    let data = [0xfdu8, 0xff, 0xff];
    assert_eq!(
        SuperDstTriggerSeries::load(&mut data.as_slice()),
        Err(DecodeError::UnexpectedEob)
    );
}
