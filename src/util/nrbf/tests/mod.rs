mod test_parser;
