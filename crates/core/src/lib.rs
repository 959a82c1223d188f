pub mod classification {
    pub mod domain {
        pub mod classifier;
    }
    pub mod infrastructure;
}

pub mod codec {
    pub mod image_codec;
    pub mod image_file;
}

pub mod detection {
    pub mod domain {
        pub mod face_locator;
    }
    pub mod infrastructure;
}

pub mod gallery {
    pub mod domain {
        pub mod gallery_store;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod analysis_report;
    pub mod capture_use_case;
    pub mod debug_faces_use_case;
    pub mod engine_registry;
    pub mod frame_analyzer;
}

pub mod shared {
    pub mod bounding_box;
    pub mod config;
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
    pub mod numeric;
}
