use case_parsing::{
    parse_casexml, parse_casexml_string, ParsingError, Relationship, SourceType, ValidationError,
    CASEXML_XMLNS,
};
use chrono::NaiveDate;

const CASE_XML_1: &str = r#"
<case xmlns="http://commcarehq.org/case/transaction/v2" case_id="3F2504E04F8911D39A0C0305E82C3301" date_modified="2014-01-15T13:12:33.139-05" user_id="9R3504E04F8911D39A0C0305E82C3301">
    <create>
        <case_type>houshold_rollout_ONICAF</case_type>
        <case_name>Smith</case_name>
        <owner_id>9R3504E04F8911D39A0C0305E82C3301</owner_id>
    </create>
    <update>
        <household_id>24/F23/3</household_id>
        <primary_contact_name>Tom Smith</primary_contact_name>
        <visit_number>1</visit_number>
    </update>
 </case>
"#;

const CASE_XML_2: &str = r#"
<case xmlns="http://commcarehq.org/case/transaction/v2" case_id="3F2504E04F8911D39A0C0305E82C3301" date_modified="2014-01-15T13:12:33.139-05" user_id="9R3504E04F8911D39A0C0305E82C3301">
    <update>
        <visit_number>2</visit_number>
        <my_date>2014-01-15T13:12:33.139-05</my_date>
    </update>
</case>
"#;

const CASE_XML_3: &str = r#"
<case xmlns="http://commcarehq.org/case/transaction/v2" case_id="3F2504E04F8911D39A0C0305E82C3301" user_id="9R3504E04F8911D39A0C0305E82C3301" date_modified="2014-01-15T13:12:33.139-05">
    <close/>
</case>
"#;

const NO_BODY: &str = r#"
<case xmlns="http://commcarehq.org/case/transaction/v2" case_id="3F2504E04F8911D39A0C0305E82C3301" user_id="9R3504E04F8911D39A0C0305E82C3301" date_modified="2014-01-15T13:12:33.139-05"/>
"#;

const NO_XMLNS: &str = r#"
<case case_id="3F2504E04F8911D39A0C0305E82C3301" user_id="9R3504E04F8911D39A0C0305E82C3301" date_modified="2014-01-15T13:12:33.139-05"/>
"#;

const NO_CASE_ID: &str = r#"
<case xmlns="http://commcarehq.org/case/transaction/v2" user_id="9R3504E04F8911D39A0C0305E82C3301" date_modified="2014-01-15T13:12:33.139-05"/>
"#;

const EXTRA_ATTRIBUTE: &str = r#"
<case foo="bar" xmlns="http://commcarehq.org/case/transaction/v2" case_id="3F2504E04F8911D39A0C0305E82C3301" user_id="9R3504E04F8911D39A0C0305E82C3301" date_modified="2014-01-15T13:12:33.139-05"/>
"#;

const SUBCASE: &str = r#"
<case xmlns="http://commcarehq.org/case/transaction/v2" case_id="SADF2343223I4IU43A0C0305E82C3301" date_modified="2014-01-15T13:12:33.139-05" user_id="9R3504E04F8911D39A0C0305E82C3301">
    <create>
        <case_type>houshold_ONICAF_referral</case_type>
        <case_name>illness</case_name>
    </create>
    <update>
        <followup_date>11/17/09</followup_date>
    </update>
    <index>
        <household_case case_type="houshold_rollout_ONICAF">3F2504E04F8911D39A0C0305E82C3301</household_case>
    </index>
</case>
"#;

const ATTACHMENT: &str = r#"
<case xmlns="http://commcarehq.org/case/transaction/v2" case_id="83789c75-9587-4df0-bf4a-8c81e6b64c0b" user_id="f8025f339922d82a9abb2a340b0a4ce3" date_modified="2013-03-07T15:00:37.026-05" xmlns:n0="http://commcarehq.org/case/transaction/v2">
    <attachment>
        <photo src="1362686433763.jpg" from="local"/>
    </attachment>
</case>
"#;

fn validation_error(xml: &str) -> ValidationError {
    match parse_casexml_string(xml) {
        Err(ParsingError::Validation(err)) => err,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn case_xml_1() {
    let block = parse_casexml_string(CASE_XML_1).unwrap();
    assert_eq!(block.xmlns, CASEXML_XMLNS);
    assert_eq!(block.case_id, "3F2504E04F8911D39A0C0305E82C3301");
    assert_eq!(
        block.date_modified,
        NaiveDate::from_ymd_opt(2014, 1, 15)
            .unwrap()
            .and_hms_micro_opt(18, 12, 33, 139_000)
            .unwrap()
    );
    assert_eq!(
        block.user_id.as_deref(),
        Some("9R3504E04F8911D39A0C0305E82C3301")
    );

    let create = block.create.as_ref().unwrap();
    assert_eq!(create.case_type, "houshold_rollout_ONICAF");
    assert_eq!(create.case_name, "Smith");
    assert_eq!(
        create.owner_id.as_deref(),
        Some("9R3504E04F8911D39A0C0305E82C3301")
    );

    assert_eq!(block.update.get("household_id"), Some("24/F23/3"));
    assert_eq!(block.update.get("primary_contact_name"), Some("Tom Smith"));
    assert_eq!(block.update.get("visit_number"), Some("1"));
    assert!(!block.close());
    assert!(block.index.is_empty());
    assert!(block.attachment.is_empty());
}

#[test]
fn case_xml_2_keeps_update_values_unconverted() {
    let block = parse_casexml_string(CASE_XML_2).unwrap();
    assert_eq!(
        block.update.get("my_date"),
        Some("2014-01-15T13:12:33.139-05")
    );
    assert_eq!(block.update.get("visit_number"), Some("2"));
    assert!(block.create.is_none());
    assert!(!block.close());
}

#[test]
fn case_xml_3_closes() {
    let block = parse_casexml_string(CASE_XML_3).unwrap();
    assert!(block.close());
}

#[test]
fn no_body() {
    let block = parse_casexml_string(NO_BODY).unwrap();
    assert!(!block.close());
    assert!(block.update.is_empty());
}

#[test]
fn no_xmlns() {
    let err = validation_error(NO_XMLNS);
    assert!(matches!(err, ValidationError::MissingField { .. }));
    assert_eq!(err.field(), Some("@xmlns"));
    assert!(err.to_string().contains("required field missing: @xmlns"));
}

#[test]
fn no_case_id() {
    let err = validation_error(NO_CASE_ID);
    assert!(matches!(err, ValidationError::MissingField { .. }));
    assert!(err.to_string().contains("required field missing: @case_id"));
}

#[test]
fn extra_attribute() {
    let err = validation_error(EXTRA_ATTRIBUTE);
    assert_eq!(
        err,
        ValidationError::UnexpectedField {
            field: "@foo".to_string(),
            block: "CaseBlock",
        }
    );
    assert_eq!(err.to_string(), "unexpected field: @foo on CaseBlock");
}

#[test]
fn subcase() {
    let block = parse_casexml_string(SUBCASE).unwrap();
    assert_eq!(block.index.len(), 1);
    let item = &block.index["household_case"];
    assert_eq!(item.case_type, "houshold_rollout_ONICAF");
    assert_eq!(item.case_id, "3F2504E04F8911D39A0C0305E82C3301");
    assert_eq!(item.relationship, Relationship::Child);
    assert_eq!(block.update.get("followup_date"), Some("11/17/09"));
}

#[test]
fn attachment() {
    let block = parse_casexml_string(ATTACHMENT).unwrap();
    assert_eq!(block.attachment.len(), 1);
    let item = &block.attachment["photo"];
    assert_eq!(item.src.as_deref(), Some("1362686433763.jpg"));
    assert_eq!(item.src_type, SourceType::Local);
    assert_eq!(item.data(), None);
}

#[test]
fn extension_index() {
    let xml = r#"
<case xmlns="http://commcarehq.org/case/transaction/v2" case_id="c2" date_modified="2015-06-01T10:00:00Z">
    <index>
        <host case_type="household" relationship="extension">c1</host>
    </index>
</case>"#;
    let block = parse_casexml(xml).unwrap();
    assert_eq!(block.index["host"].relationship, Relationship::Extension);
}

#[test]
fn inline_attachment_payload() {
    let xml = r#"
<case xmlns="http://commcarehq.org/case/transaction/v2" case_id="c1" date_modified="2015-06-01T10:00:00Z">
    <attachment>
        <note from="inline" name="note.txt">
            aGVsbG8g
            d29ybGQ=
        </note>
    </attachment>
</case>"#;
    let block = parse_casexml(xml).unwrap();
    let note = &block.attachment["note"];
    assert_eq!(note.src_type, SourceType::Inline);
    assert_eq!(note.name.as_deref(), Some("note.txt"));
    assert_eq!(note.data(), Some(&b"hello world"[..]));
}

#[test]
fn unknown_attachment_source() {
    let xml = r#"
<case xmlns="http://commcarehq.org/case/transaction/v2" case_id="c1" date_modified="2015-06-01T10:00:00Z">
    <attachment><photo src="a.jpg" from="ftp"/></attachment>
</case>"#;
    let err = validation_error(xml);
    match err {
        ValidationError::InvalidChoice {
            field,
            block,
            value,
            allowed,
        } => {
            assert_eq!(field, "@from");
            assert_eq!(block, "AttachmentItem");
            assert_eq!(value, "ftp");
            assert_eq!(allowed, ["local", "remote", "inline"]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn bad_date_modified() {
    let xml = r#"<case xmlns="http://commcarehq.org/case/transaction/v2" case_id="c1" date_modified="2015-06-01T10:00:00"/>"#;
    let err = validation_error(xml);
    assert!(matches!(
        err,
        ValidationError::InvalidTimestamp { ref field, .. } if field == "@date_modified"
    ));
}

#[test]
fn close_with_content_is_rejected() {
    let xml = r#"<case xmlns="http://commcarehq.org/case/transaction/v2" case_id="c1" date_modified="2015-06-01T10:00:00Z"><close>now</close></case>"#;
    let err = validation_error(xml);
    assert!(matches!(err, ValidationError::InvalidChoice { ref field, .. } if field == "close"));
}

#[test]
fn repeated_update_block_is_rejected() {
    let xml = r#"<case xmlns="http://commcarehq.org/case/transaction/v2" case_id="c1" date_modified="2015-06-01T10:00:00Z"><update><a>1</a></update><update><b>2</b></update></case>"#;
    let err = validation_error(xml);
    assert_eq!(err.to_string(), "UpdateBlock must be a mapping, got an array");
}

#[test]
fn malformed_markup() {
    let err = parse_casexml_string("<case xmlns=").unwrap_err();
    assert!(matches!(err, ParsingError::Markup(_)));
}
