//! Canned diagnosis replies
//!
//! Maps the detector's class names to fixed treatment advice. The reply is
//! decided by the last detection in the result table, not the most confident
//! one.

use crate::channels::SendMessage;
use crate::vision::Detection;

/// First message of every diagnosis reply
pub const RESULT_HEADER: &str = "ผลการตรวจโรค:";

/// Sole reply when nothing recognisable was detected or processing failed
pub const NO_DISEASE_TEXT: &str = "ไม่ตรวจพบเจอโรค หรือ มีข้อผิดพลาด";

/// Advice attached to one detector class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiseaseAdvisory {
    /// Class name as emitted by the model
    pub class_name: &'static str,
    /// Text sent after the annotated image
    pub text: &'static str,
    /// Whether the class means no disease
    pub healthy: bool,
}

const ANTHRACNOSE_TEXT: &str = r#"
พบเจอโรค แอนเเทรคโนส (anthracnose)  เกิดจากเชื้อรา Colletotrichum Zibethinum ทำลายช่อดอกในระยะช่อบาน ทำให้ดอกมีสีคล้ำ เน่าดำก่อนบาน มีราสีเทาดำปกคลุมเกสร กลีบดอก ทำให้ดอกแห้ง ร่วงหล่น

วิธีรักษาโรค:
1.ตัดแต่งพุ่มให้โปร่ง
2.ฉีดพ่นด้วย mancozeb ผสมหรือสลับกับ carbendazim
3.ฉีดพ่นด้วย ผลิตภัณฑ์ ซุปเปอร์โวก้าโปรคีโตพลัส ในช่วงเย็น (ห้ามใช้สารเคมีกำจัดเชื้อรา ร่วมกับ คีโตพลัส)
4.เติมสารซุปเปอร์ซิลิคอนโวก้า 1 ช้อนโต๊ะ ในถังฉีด เพื่อเพิ่มประสิทธิภาพของ สารเคมี  

ยาที่ใช้ในการรักษาโรค:
1.จัมเปอร์
    https://shope.ee/6fErA9IocH
2.เค็นจิ
    https://shope.ee/hvk4PDUH
3.การ์แรต
    https://shope.ee/4pnCzc9Bnc
"#;

const LEAF_SPOT_TEXT: &str = r#"
พบเจอโรค ใบจุด (Leaf Spot) เกิดจากเชื้อราหลายชนิด โดย หากเป็นเชื้อ Colletotrichum sp. ซึ่งทำให้เกิดโรคแอนแทรคโนส ใบอ่อนจะมีสีซีดคล้ายโดนน้ำร้อนลวก ส่วนขยายพันธุ์เป็นจุดดำ ๆ ส่วนใบแก่เป็นจุดกลมขอบแผลสีเข้ม และมีการขยายขนาด

วิธีรักษาโรค:
1.ฉีดพ่นทุเรียนระยะใบอ่อน ด้วย สารกลุ่ม mancozeb ผสมกับกลุ่ม benzimidazole เช่น benomyl หรือ carbendazim
2.ฉีดพ่นด้วย ผลิตภัณฑ์ชีวภัณฑ์ ซุปเปอร์โวก้าโปรคีโตพลัส ในช่วงเย็น (ห้ามใช้สารเคมีกำจัดเชื้อรา ร่วมกับ คีโตพลัส)
3.เติมสารซุปเปอร์ซิลิคอนโวก้า 1 ช้อนโต๊ะ ในถังฉีด เพื่อเพิ่มประสิทธิภาพของสารเคมีและชึวภัณฑ์

ยาที่ใช้ในการรักษาโรค:
1.จัมเปอร์
    https://shope.ee/6fErA9IocH
2.เค็นจิ
    https://shope.ee/hvk4PDUH
3.การ์แรต
    https://shope.ee/4pnCzc9Bnc
"#;

const LEAF_BLIGHT_TEXT: &str = r#"
พบเจอโรค ใบติด,ใบไหม้,ใบร่วง (Leaf blight, leaf fall) เชื้อสัมผัสกับใบ ทำให้กิ่งเน่า เกิดจากเชื้อรา Rhizoctonia solani ลักษณะอาการใบจะไหม้ แห้ง และติดกันเป็นกระจุก และร่วงจำนวนมาก ใบติดกันด้วยเส้นใยของเชื้อรา ใบคล้ายถูกน้ำร้อนลวก สีซีด ขอบแผลสีเขียวเข้ม

สาเหตุของโรค:
-แดดเผา(Sun burn)
ใบยังไม่แก่พอ ทำให่ความต้านทานต่อแสงแดดมีน้อยเกิดอาการใบไหม้เมื่อมีอุณหภูมิสูว เป็นเวลานาน ใบจะมีอัตราการคายน้ำที่สูงจะเริ่มเหลืองและเกิดอาการใบไหม้
-การใส่ปุ๋ย สารเคมี
ผสมปุ๋ยยาที่เข้มข้นเกินไป และการใช้ยาร้อยในขณะยังเป็นใบอ่อนควรให้ปริมาณเหมาะสมกับสภาพของพืช
-เชื้อฟิวซาเรียม
ปลายใบทุเรียนจะเป็นใบแห้งๆ ส่องปลายใบกับแดดจะพบสปอร์เป็นขุยขาวๆ ของเชื้อรา ยอกทุเรียนที่แตกใหม่จะสักเกตุขุยสปอร์ทำให้ยอดแห้ง หากเป็นที่กึ่งจะลามรวดเร็วและทำให้กิ่งแห้ง
-การให้น้ำ
กระจายวงน้ำให้ทั่วอย่างน้อย80% ของทรงพุ่มโดยเฉพาะช่วงหน้าแล้งอากาศร้อนจัด ถ้าให้น้ำน้อยเกินไปก็จะไปส่งเสริมให้เกิดอาการใบไหม้"Sun Burn" ได้ง่ายขึ้น

วิธีรักษาโรค:
1.รวมรวมเศษใบที่ร่วงเผาทำลาย กำจัดวัชพืช
2.ฉีดพ่นด้วย copper oxychloride หรือ mancozeb
3.ฉีดพ่นด้วย ซุปเปอร์โวก้าโปรคีโตพลัส (ห้ามใช้สารเคมีกำจัดเชื้อรา ร่วมกับ คีโตพลัส)
4.เติมสารซุปเปอร์ซิลิคอนโวก้า 1 ช้อนโต๊ะ ในถังฉีด เพื่อเพิ่มประสิทธิภาพของ สารเคมี และชีวภัณฑ์
5.ควบคุมเชื้อราในดิน โดยการใช้ปุ๋ยโวก้าอินทรีย์ ประมาณ 5 กก. ผสมซุปเปอร์โวก้าโปรคีโตพลัส 50 กรัม คลุกให้ทั่ว นำปุ๋ยที่ได้หว่านรอบทรงพุ่มเพื่อควบคุมเชื้อรา

ยาที่ใช้ในการรักษาโรค
1.จัมเปอร์
    https://shope.ee/6fErA9IocH
2.เค็นจิ
    https://shope.ee/hvk4PDUH
3.การ์แรต
    https://shope.ee/4pnCzc9Bnc
"#;

const ALGAL_LEAF_SPOT_TEXT: &str = r#"
พบเจอโรค โรคราสนิม (Rust disease) เกิดจากสาหร่าย Cephaleuros virescens Kunze พบ ในใบแก่ ลักษณะเป็นจุดฟูเสีเขียวแกมเหลือง ต่อมาเปลี่ยนเป็นสีเหลืองแกมส้ม ซึ่งเป็นระยะที่สาหร่ายสร้างสปอร์ เพื่อใช้ในการแพร่ระบาด

วิธีรักษาโรค:
1.ฉีดพ่นด้วย Copper oxychloride
2.เติมสารซุปเปอร์ซิลิคอนโวก้า 1 ช้อนโต๊ะ ในถังฉีด เพื่อเพิ่มประสิทธิภาพของ สารเคมี และชีวภัณฑ์

ยาที่ใช้ในการรักษาโรค:
1.จอยท์
    https://shope.ee/fxe5gOXum
"#;

const HEALTHY_TEXT: &str = r#"ใบของคุณมีสภาพแข็งแรงปกติ"#;

/// Every class the bot has advice for
pub static ADVISORIES: [DiseaseAdvisory; 5] = [
    DiseaseAdvisory {
        class_name: "Anthracnose",
        text: ANTHRACNOSE_TEXT,
        healthy: false,
    },
    DiseaseAdvisory {
        class_name: "Leaf Spot",
        text: LEAF_SPOT_TEXT,
        healthy: false,
    },
    DiseaseAdvisory {
        class_name: "Leaf Blight",
        text: LEAF_BLIGHT_TEXT,
        healthy: false,
    },
    DiseaseAdvisory {
        class_name: "Algal leaf Spot",
        text: ALGAL_LEAF_SPOT_TEXT,
        healthy: false,
    },
    DiseaseAdvisory {
        class_name: "Healthy",
        text: HEALTHY_TEXT,
        healthy: true,
    },
];

/// Advice for an exact class name
#[must_use]
pub fn lookup(class_name: &str) -> Option<&'static DiseaseAdvisory> {
    ADVISORIES.iter().find(|a| a.class_name == class_name)
}

/// Pick the advice for a detection table: the last row decides
#[must_use]
pub fn diagnose(detections: &[Detection]) -> Option<&'static DiseaseAdvisory> {
    detections.last().and_then(|d| lookup(&d.class_name))
}

/// Messages for one diagnosis reply
#[must_use]
pub fn compose_reply(advisory: Option<&DiseaseAdvisory>, image_url: &str) -> Vec<SendMessage> {
    match advisory {
        Some(advisory) => vec![
            SendMessage::text(RESULT_HEADER),
            SendMessage::image(image_url),
            SendMessage::text(advisory.text),
        ],
        None => vec![SendMessage::text(NO_DISEASE_TEXT)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::BoundingBox;

    fn detection(class_name: &str, confidence: f32) -> Detection {
        Detection {
            class_id: 0,
            class_name: class_name.to_string(),
            confidence,
            bbox: BoundingBox {
                xmin: 0.0,
                ymin: 0.0,
                xmax: 1.0,
                ymax: 1.0,
            },
        }
    }

    #[test]
    fn last_detection_wins_over_confidence() {
        let detections = [detection("Anthracnose", 0.95), detection("Healthy", 0.30)];
        let advisory = diagnose(&detections).unwrap();
        assert_eq!(advisory.class_name, "Healthy");
        assert!(advisory.healthy);
    }

    #[test]
    fn no_detections_means_no_advice() {
        assert!(diagnose(&[]).is_none());
        assert_eq!(
            compose_reply(None, "https://x/y.jpg"),
            vec![SendMessage::text(NO_DISEASE_TEXT)]
        );
    }

    #[test]
    fn unknown_label_falls_through() {
        assert!(diagnose(&[detection("Anthracnose", 0.9), detection("person", 0.5)]).is_none());
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert!(lookup("Algal leaf Spot").is_some());
        assert!(lookup("Algal Leaf Spot").is_none());
    }

    #[test]
    fn disease_reply_has_header_image_and_advice() {
        let advisory = lookup("Anthracnose");
        let reply = compose_reply(advisory, "https://bot.example.com/static/tmp/a_result.jpg");

        assert_eq!(reply.len(), 3);
        assert_eq!(reply[0], SendMessage::text(RESULT_HEADER));
        assert_eq!(
            reply[1],
            SendMessage::image("https://bot.example.com/static/tmp/a_result.jpg")
        );
        assert_eq!(reply[2], SendMessage::text(ANTHRACNOSE_TEXT));
    }

    #[test]
    fn purchase_links_per_class() {
        let links = |name: &str| lookup(name).unwrap().text.matches("https://shope.ee/").count();
        assert_eq!(links("Anthracnose"), 3);
        assert_eq!(links("Leaf Spot"), 3);
        assert_eq!(links("Leaf Blight"), 3);
        assert_eq!(links("Algal leaf Spot"), 1);
        assert_eq!(links("Healthy"), 0);
    }

    #[test]
    fn disease_blocks_keep_surrounding_newlines() {
        for advisory in ADVISORIES.iter().filter(|a| !a.healthy) {
            assert!(advisory.text.starts_with("\nพบเจอโรค"), "{}", advisory.class_name);
            assert!(advisory.text.ends_with(".ee/4pnCzc9Bnc\n") || advisory.text.ends_with("/fxe5gOXum\n"));
        }
        assert_eq!(lookup("Healthy").unwrap().text, HEALTHY_TEXT);
        assert!(!HEALTHY_TEXT.starts_with('\n'));
    }
}
