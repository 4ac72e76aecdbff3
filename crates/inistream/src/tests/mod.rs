mod arbitrary;

mod property_documents;
