mod mock_db;
