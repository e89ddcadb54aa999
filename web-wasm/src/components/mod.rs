pub mod batch_upload;
pub mod notice_list;
pub mod ocr_tagger;
pub mod progress_bar;
pub mod upload_area;
